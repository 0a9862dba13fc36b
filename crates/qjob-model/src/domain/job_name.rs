/// Characters the scheduler refuses in a job name.
pub const JOB_NAME_FORBIDDEN: &[char] = &['\n', '\t', '\r', '/', ':', ',', '@', '\\', '*', '?'];

/// Replace every forbidden job-name character with `_`.
pub fn sanitize_job_name(name: &str) -> String {
    name.chars()
        .map(|c| if JOB_NAME_FORBIDDEN.contains(&c) { '_' } else { c })
        .collect()
}

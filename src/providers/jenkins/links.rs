/// Relative path of a job, `job/<name>/`. Folder paths (`team/backend`) nest as
/// `job/team/job/backend/`.
pub fn job_path(name: &str) -> String {
    name.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("job/{}/", urlencoding::encode(segment)))
        .collect()
}

/// Converts a job name to its Jenkins web URL.
///
/// # Arguments
///
/// * `host` - Jenkins root URL (e.g., <http://jenkins:8080>)
/// * `name` - Job name, optionally with folder segments
///
/// # Returns
///
/// Clickable URL to the job (e.g., <http://jenkins:8080/job/backend-ci/>)
pub fn job_url(host: &str, name: &str) -> String {
    format!("{}/{}", host.trim_end_matches('/'), job_path(name))
}

/// Console output URL of a build, or of the last build when the number is unknown.
pub fn console_url(job_url: &str, build_number: Option<u64>) -> String {
    let build = build_number.map_or_else(|| "lastBuild".to_string(), |n| n.to_string());
    format!("{}/{build}/console", job_url.trim_end_matches('/'))
}

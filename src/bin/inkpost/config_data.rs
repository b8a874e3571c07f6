use std::fs::File;
use std::io;
use std::io::Write;
use std::path::Path;

use uuid::Uuid;

const CONFIG_SAMPLE: &str = r#"# For the file locations, If you want it to be relative to the executable directory
# use ${exe_dir}/location
[paths]
template_dir = "${exe_dir}/res/template"
public_dir = "${exe_dir}/res/public"

[database]
location = "${exe_dir}/instance/posts.db"
pool_size = 4

# The secret signs the anti-forgery token of every form. Keep it private.
[security]
secret_key = "{{SECRET}}"
csrf_time_limit_secs = 3600

[server]
address = "127.0.0.1"
port = 5003

[log]
level = "Info"
log_to_console = true
"#;

pub(crate) fn write_sample_cfg(file_path: &Path) -> io::Result<()> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(file_path)?;
    file.write_all(get_sample_cfg().as_bytes())
}

fn get_sample_cfg() -> String {
    let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    CONFIG_SAMPLE.replace("{{SECRET}}", &secret)
}

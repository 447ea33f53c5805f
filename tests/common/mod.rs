use std::process::{Child, Command};
use std::time::Duration;

/// Start a qperf server on its own listen port and give it a moment to
/// come up. Callers must kill the returned child when they are done.
#[allow(dead_code)]
pub fn start_qperf_server(port: u16) -> Child {
    let child = Command::new(assert_cmd::cargo::cargo_bin("qperf"))
        .args(["-lp", &port.to_string()])
        .spawn()
        .expect("failed to start the qperf server");
    std::thread::sleep(Duration::from_secs(1));
    child
}

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn version_prints_and_exits_zero() {
    Command::cargo_bin("qperf")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout("qperf 0.2.0\n");
}

#[test]
fn unknown_options_are_rejected() {
    Command::cargo_bin("qperf")
        .unwrap()
        .arg("--no-such-option")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad option"));
}

#[test]
fn unknown_tests_are_rejected() {
    Command::cargo_bin("qperf")
        .unwrap()
        .args(["localhost", "warp_speed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad test"));
}

#[test]
fn a_test_name_alone_is_not_a_host() {
    Command::cargo_bin("qperf")
        .unwrap()
        .arg("tcp_bw")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Must specify host name first"));
}

#[test]
fn a_host_alone_needs_a_test() {
    Command::cargo_bin("qperf")
        .unwrap()
        .args(["-lp", "19970", "localhost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Must specify a test type"));
}

#[test]
fn client_only_options_need_a_host() {
    Command::cargo_bin("qperf")
        .unwrap()
        .arg("-v")
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not specify the server name"));
}

#[test]
fn options_demand_their_argument() {
    Command::cargo_bin("qperf")
        .unwrap()
        .arg("-m")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing argument to -m"));
}

#[test]
fn bad_numbers_are_reported() {
    Command::cargo_bin("qperf")
        .unwrap()
        .args(["-m", "12wombats", "localhost", "tcp_bw"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bad argument: 12wombats"));
}

#[test]
fn help_lists_the_tests() {
    Command::cargo_bin("qperf")
        .unwrap()
        .args(["-h", "tests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tcp_lat"));
}

#[test]
fn unknown_help_categories_fail() {
    Command::cargo_bin("qperf")
        .unwrap()
        .args(["-h", "wombats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot find help category"));
}

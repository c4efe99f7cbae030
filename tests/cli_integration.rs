use assert_cmd::Command;
use serde_json::Value;

const MAIL_SIGNING_HASH: &str =
    "0xbe609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2";

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("eip712-path"));
    // keep the limits independent of the caller's environment
    cmd.env_remove("EIP712_MAX_PATH_DEPTH")
        .env_remove("EIP712_MAX_ARRAY_DEPTH")
        .env_remove("EIP712_HASH_SLOTS");
    cmd
}

fn run_json(cmd: &mut Command) -> (bool, Value) {
    let output = cmd.arg("--json").output().expect("cli runs");
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf8");
    let value = serde_json::from_str(&stdout).expect("stdout is valid json");
    (output.status.success(), value)
}

#[test]
fn cli_hashes_mail_fixture() {
    let (success, report) = run_json(cli().arg(fixture("mail.json")).arg("--verify"));

    assert!(success, "cli failed: {}", report);
    assert_eq!(report["primary_type"], "Mail");
    assert_eq!(
        report["domain_hash"],
        "0xf2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
    );
    assert_eq!(
        report["message_hash"],
        "0xc52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
    );
    assert_eq!(report["signing_hash"], MAIL_SIGNING_HASH);
}

#[test]
fn cli_reads_stdin() {
    let payload = std::fs::read_to_string(fixture("mail.json")).expect("fixture exists");
    let (success, report) = run_json(cli().arg("-").write_stdin(payload));

    assert!(success);
    assert_eq!(report["signing_hash"], MAIL_SIGNING_HASH);
}

#[test]
fn cli_text_output() {
    let output = cli()
        .arg(fixture("mail.json"))
        .arg("--preset")
        .arg("constrained")
        .output()
        .expect("cli runs");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf8");
    assert!(stdout.contains(&format!("Signing hash:   {}", MAIL_SIGNING_HASH)));
}

#[test]
fn cli_reports_depth_limit_as_json() {
    let payload = std::fs::read_to_string(fixture("mail.json")).expect("fixture exists");
    let (success, report) = run_json(
        cli()
            .env("EIP712_MAX_PATH_DEPTH", "1")
            .write_stdin(payload),
    );

    assert!(!success);
    assert_eq!(report["code"], "depth_exceeded");
}

#[test]
fn cli_rejects_malformed_json() {
    let (success, report) = run_json(cli().write_stdin("{\"types\": "));

    assert!(!success);
    assert_eq!(report["code"], "json_error");
}

#[test]
fn cli_rejects_bad_environment() {
    let payload = std::fs::read_to_string(fixture("mail.json")).expect("fixture exists");
    let (success, report) = run_json(cli().env("EIP712_HASH_SLOTS", "many").write_stdin(payload));

    assert!(!success);
    assert_eq!(report["code"], "invalid_config");
}

#[test]
fn cli_missing_file() {
    let (success, report) = run_json(cli().arg(fixture("does-not-exist.json")));

    assert!(!success);
    assert_eq!(report["code"], "invalid_input");
}

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn bin(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bootkeys"));
    cmd.env_remove("RUST_LOG")
        .env("BOOTKEYS_KEY_BITS", "2048")
        .arg("--dir")
        .arg(dir);
    cmd
}

#[test]
fn generate_keys_writes_pem_files() {
    let dir = tempdir().unwrap();

    bin(dir.path())
        .arg("generate-keys")
        .assert()
        .success()
        .stdout(predicate::str::contains("key pairs written"));

    for name in [
        "sig.rsa.pub.pem",
        "sig.rsa.prv.pem",
        "enc.rsa.pub.pem",
        "enc.rsa.prv.pem",
    ] {
        assert!(dir.path().join("keys").join(name).exists(), "{name} missing");
    }
}

#[test]
fn jwks_prints_public_key_set() {
    let dir = tempdir().unwrap();

    bin(dir.path()).arg("generate-keys").assert().success();

    let output = bin(dir.path()).arg("jwks").output().unwrap();
    assert!(output.status.success());

    let jwks: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let keys = jwks["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0]["use"], "sig");
    assert_eq!(keys[1]["use"], "enc");
    for key in keys {
        assert_eq!(key["kty"], "RSA");
        assert_eq!(key["alg"], "RS256");
        assert_eq!(key["e"], "AQAB");
        assert!(key.get("d").is_none());
    }
}

#[test]
fn jwks_without_keys_fails_with_path() {
    let dir = tempdir().unwrap();

    bin(dir.path())
        .arg("jwks")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to read the public key"))
        .stderr(predicate::str::contains("sig.rsa.pub.pem"));
}

#[test]
fn no_overwrite_refuses_existing_keys() {
    let dir = tempdir().unwrap();

    bin(dir.path()).arg("generate-keys").assert().success();
    let before = std::fs::read(dir.path().join("keys/sig.rsa.prv.pem")).unwrap();

    bin(dir.path())
        .arg("generate-keys")
        .arg("--no-overwrite")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let after = std::fs::read(dir.path().join("keys/sig.rsa.prv.pem")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn generate_and_show_token() {
    let dir = tempdir().unwrap();

    let output = bin(dir.path()).arg("generate-token").output().unwrap();
    assert!(output.status.success());
    let token = String::from_utf8(output.stdout).unwrap().trim().to_string();
    assert_eq!(token.len(), 512);

    bin(dir.path())
        .arg("show-token")
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{token}\n")));
}

#[test]
fn show_token_without_token_fails() {
    let dir = tempdir().unwrap();

    bin(dir.path())
        .arg("show-token")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to read setup token"));
}

#[test]
fn info_lists_file_presence() {
    let dir = tempdir().unwrap();

    bin(dir.path()).arg("generate-token").assert().success();

    bin(dir.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("missing  "))
        .stdout(predicate::str::contains("present  "))
        .stdout(predicate::str::contains("setup.token"));
}

#[test]
fn small_key_size_is_rejected() {
    let dir = tempdir().unwrap();

    bin(dir.path())
        .arg("--key-bits")
        .arg("1024")
        .arg("generate-keys")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 2048"));

    assert!(!dir.path().join("keys").exists());
}

#[test]
fn small_key_size_does_not_block_reads() {
    let dir = tempdir().unwrap();

    bin(dir.path()).arg("generate-keys").assert().success();
    bin(dir.path()).arg("generate-token").assert().success();

    for command in ["show-token", "jwks", "info"] {
        bin(dir.path())
            .env("BOOTKEYS_KEY_BITS", "1024")
            .arg(command)
            .assert()
            .success();
    }
}

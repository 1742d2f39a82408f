//! PID file guard tests.

use std::fs;

use vigil_daemon::pid::PidFile;

#[test]
fn creates_file_with_current_pid() {
    // Given
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("run").join("vigil.pid");

    // When
    let guard = PidFile::create(&path).expect("should create PID file");

    // Then: parent directory created, content is our PID
    let content = fs::read_to_string(guard.path()).expect("should read PID file");
    assert_eq!(content.trim(), std::process::id().to_string());
}

#[test]
fn drop_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vigil.pid");

    {
        let _guard = PidFile::create(&path).unwrap();
        assert!(path.exists());
    }

    assert!(!path.exists(), "PID file should be removed on drop");
}

#[test]
fn existing_file_is_refused() {
    // Given: another instance left its PID behind
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vigil.pid");
    fs::write(&path, "12345\n").unwrap();

    // When
    let err = PidFile::create(&path).unwrap_err();

    // Then: the file is left alone
    let message = err.to_string();
    assert!(message.contains("already exists"), "got: {message}");
    assert!(message.contains("12345"), "got: {message}");
    assert_eq!(fs::read_to_string(&path).unwrap(), "12345\n");
}

#[test]
fn second_guard_for_same_path_fails_while_first_is_alive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vigil.pid");

    let _first = PidFile::create(&path).unwrap();
    assert!(PidFile::create(&path).is_err());
}

#[cfg(unix)]
#[test]
fn file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let guard = PidFile::create(dir.path().join("vigil.pid")).unwrap();

    let mode = fs::metadata(guard.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

use super::*;
use tempfile::TempDir;

#[test]
fn missing_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let log = ConversationLog::load(dir.path().join("memory.json")).unwrap();
    assert!(log.is_empty());
    assert_eq!(log.len(), 0);
}

#[test]
fn append_persists_immediately() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory.json");

    let mut log = ConversationLog::load(&path).unwrap();
    log.append("what is rust?", "a systems language").unwrap();

    assert!(path.exists());
    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["conversations"][0]["prompt"], "what is rust?");
    assert_eq!(parsed["conversations"][0]["response"], "a systems language");
}

#[test]
fn reload_preserves_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory.json");

    {
        let mut log = ConversationLog::load(&path).unwrap();
        log.append("first", "one").unwrap();
        log.append("second", "two").unwrap();
    }

    let log = ConversationLog::load(&path).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log.exchanges()[0].prompt, "first");
    assert_eq!(log.exchanges()[1].response, "two");
}

#[test]
fn append_grows_by_one() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory.json");

    let mut log = ConversationLog::load(&path).unwrap();
    for i in 0..5 {
        let before = log.len();
        log.append(format!("q{i}"), format!("a{i}")).unwrap();
        assert_eq!(log.len(), before + 1);
    }

    let reloaded = ConversationLog::load(&path).unwrap();
    assert_eq!(reloaded.len(), 5);
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(ConversationLog::load(&path).is_err());
}

#[test]
fn creates_parent_directories_on_persist() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deep").join("memory.json");

    let mut log = ConversationLog::load(&path).unwrap();
    log.append("q", "a").unwrap();
    assert!(path.exists());
}

use camino::Utf8PathBuf;

use mg_survey::cache::MetadataCache;
use mg_survey::domain::MetagenomeId;

#[test]
fn ids_are_sorted_and_skip_strays() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let cache = MetadataCache::new(root.clone());

    for id in ["4447195.3", "4447192.3"] {
        let id: MetagenomeId = id.parse().unwrap();
        cache.store(&id, b"{}").unwrap();
    }
    std::fs::write(root.join("notes.txt").as_std_path(), b"x").unwrap();
    std::fs::create_dir_all(root.join("4440000.3").as_std_path()).unwrap();

    let ids: Vec<String> = cache.ids().unwrap().iter().map(|id| id.to_string()).collect();
    assert_eq!(ids, vec!["4447192.3", "4447195.3"]);
}

#[test]
fn store_overwrites_existing_document() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let cache = MetadataCache::new(root);
    let id: MetagenomeId = "4447192.3".parse().unwrap();

    cache.store(&id, b"{\"v\": 1}").unwrap();
    cache.store(&id, b"{\"v\": 2}").unwrap();

    assert_eq!(cache.load(&id).unwrap()["v"], 2);
}

#[test]
fn missing_document_is_a_cache_miss() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let cache = MetadataCache::new(root);
    let id: MetagenomeId = "1.3".parse().unwrap();
    assert!(cache.load_raw(&id).is_err());
}

//! Tests for the storage layer
//!
//! These tests verify:
//! - Header encoding, checksum bypass and strict mode
//! - Snapshot build and load, including checksum failures
//! - SnapshotManager discovery, fallback and cleanup

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;

use atlaskv_store::collection::CollectionData;
use atlaskv_store::registry::CollectionRegistry;
use atlaskv_store::storage::{
    HeaderFile, HeaderStatus, SnapshotBuilder, SnapshotManager, SnapshotReader, StoreHeader,
    HEADER_SIZE,
};
use atlaskv_store::{AtlasError, CollectionKind};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_registry() -> CollectionRegistry {
    let mut hash = HashMap::new();
    hash.insert("x".to_string(), "1".to_string());
    hash.insert("empty".to_string(), String::new());

    let set: BTreeSet<String> = ["banana", "apple", ""].iter().map(|s| s.to_string()).collect();

    let mut collections = BTreeMap::new();
    collections.insert("kv".to_string(), CollectionData::Hash(hash));
    collections.insert("s".to_string(), CollectionData::OrderedSet(set));
    collections.insert(
        "unused".to_string(),
        CollectionData::empty(CollectionKind::Hash),
    );
    CollectionRegistry::from_collections(collections)
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_header_encode_decode() {
    let header = StoreHeader::new(3, 42);
    let bytes = header.encode();

    assert_eq!(bytes.len(), HEADER_SIZE);
    assert_eq!(&bytes[0..4], b"ATKS");

    let (decoded, status) = StoreHeader::decode(&bytes, false).unwrap();
    assert_eq!(decoded, header);
    assert_eq!(status, HeaderStatus::Valid);
}

#[test]
fn test_header_checksum_mismatch_bypassed() {
    let mut bytes = StoreHeader::new(1, 9).encode();
    bytes[24] ^= 0x01; // stored CRC

    let (decoded, status) = StoreHeader::decode(&bytes, true).unwrap();

    assert_eq!(decoded.generation, 1);
    assert_eq!(decoded.last_seq, 9);
    assert!(matches!(status, HeaderStatus::ChecksumBypassed { stored, computed } if stored != computed));
}

#[test]
fn test_header_checksum_mismatch_strict() {
    let mut bytes = StoreHeader::new(1, 9).encode();
    bytes[10] ^= 0xFF; // generation field

    let err = StoreHeader::decode(&bytes, false).unwrap_err();
    assert!(matches!(err, AtlasError::Format(_)));
}

#[test]
fn test_header_bad_magic_is_never_bypassed() {
    let mut bytes = StoreHeader::new(1, 1).encode();
    bytes[0] = b'X';

    let err = StoreHeader::decode(&bytes, true).unwrap_err();
    assert!(matches!(err, AtlasError::Format(_)));
}

#[test]
fn test_header_too_short() {
    let bytes = StoreHeader::new(1, 1).encode();
    let err = StoreHeader::decode(&bytes[..20], true).unwrap_err();
    assert!(matches!(err, AtlasError::Format(_)));
}

#[test]
fn test_header_read_missing_file() {
    let temp = TempDir::new().unwrap();
    let result = StoreHeader::read(&temp.path().join("store.hdr"), true).unwrap();
    assert_eq!(result, HeaderFile::Missing);
}

#[test]
fn test_header_read_reports_torn_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.hdr");

    fs::write(&path, b"").unwrap();
    assert_eq!(
        StoreHeader::read(&path, false).unwrap(),
        HeaderFile::Unreadable { len: 0 }
    );

    fs::write(&path, [0u8; HEADER_SIZE]).unwrap();
    assert_eq!(
        StoreHeader::read(&path, false).unwrap(),
        HeaderFile::Unreadable { len: HEADER_SIZE }
    );
}

#[test]
fn test_header_read_unknown_version_is_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.hdr");
    let mut bytes = StoreHeader::new(1, 1).encode();
    bytes[4] = 9;
    fs::write(&path, bytes).unwrap();

    let err = StoreHeader::read(&path, true).unwrap_err();
    assert!(matches!(err, AtlasError::Format(_)));
}

#[test]
fn test_header_write_in_place() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.hdr");

    StoreHeader::new(1, 1).write(&path).unwrap();
    StoreHeader::new(2, 5).write(&path).unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), HEADER_SIZE as u64);
    let found = StoreHeader::read(&path, false).unwrap();
    assert_eq!(found, HeaderFile::Present(StoreHeader::new(2, 5), HeaderStatus::Valid));
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_build_and_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snapshot_000001.snap");
    let registry = sample_registry();

    let mut builder = SnapshotBuilder::new(&path, 17, registry.len() as u32).unwrap();
    for (name, data) in registry.iter() {
        builder.add_collection(name, data).unwrap();
    }
    let meta = builder.finish().unwrap();

    assert_eq!(meta.last_seq, 17);
    assert_eq!(meta.collection_count, 3);
    assert_eq!(meta.entry_count, 5);
    assert_eq!(meta.file_size, fs::metadata(&path).unwrap().len());

    let loaded = SnapshotReader::load(&path).unwrap();
    assert_eq!(loaded.last_seq, 17);
    assert_eq!(loaded.entry_count, 5);
    assert_eq!(CollectionRegistry::from_collections(loaded.collections), registry);
}

#[test]
fn test_snapshot_footer_layout() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snapshot_000001.snap");
    let registry = sample_registry();

    let mut builder = SnapshotBuilder::new(&path, 4, registry.len() as u32).unwrap();
    for (name, data) in registry.iter() {
        builder.add_collection(name, data).unwrap();
    }
    builder.finish().unwrap();

    // Footer: EntryCount (8) | DataCRC (4) | Padding (4)
    let bytes = fs::read(&path).unwrap();
    let footer = &bytes[bytes.len() - 16..];
    let data = &bytes[..bytes.len() - 16];

    assert_eq!(u64::from_le_bytes(footer[0..8].try_into().unwrap()), 5);
    assert_eq!(
        u32::from_le_bytes(footer[8..12].try_into().unwrap()),
        crc32fast::hash(data)
    );
    assert_eq!(&footer[12..16], &[0u8; 4]);
}

#[test]
fn test_snapshot_builder_enforces_collection_count() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snapshot_000001.snap");

    let builder = SnapshotBuilder::new(&path, 1, 2).unwrap();
    let err = builder.finish().unwrap_err();
    assert!(matches!(err, AtlasError::Encoding(_)));
}

#[test]
fn test_snapshot_crc_mismatch_is_error() {
    let temp = TempDir::new().unwrap();
    let mut manager = SnapshotManager::open(temp.path()).unwrap();
    let (generation, meta) = manager.write(3, &sample_registry()).unwrap();

    let mut bytes = fs::read(&meta.path).unwrap();
    bytes[20] ^= 0xFF;
    fs::write(&meta.path, &bytes).unwrap();

    let err = SnapshotReader::load(&manager.snapshot_path(generation)).unwrap_err();
    assert!(matches!(err, AtlasError::Format(_)));
}

#[test]
fn test_snapshot_truncated_is_error() {
    let temp = TempDir::new().unwrap();
    let mut manager = SnapshotManager::open(temp.path()).unwrap();
    let (_, meta) = manager.write(3, &sample_registry()).unwrap();

    let bytes = fs::read(&meta.path).unwrap();
    fs::write(&meta.path, &bytes[..bytes.len() / 2]).unwrap();

    assert!(SnapshotReader::load(&meta.path).is_err());
}

// =============================================================================
// SnapshotManager Tests
// =============================================================================

#[test]
fn test_manager_empty_directory() {
    let temp = TempDir::new().unwrap();
    let manager = SnapshotManager::open(temp.path()).unwrap();

    assert!(manager.generations().unwrap().is_empty());
    assert_eq!(manager.next_generation(), 1);

    let outcome = manager.load(0).unwrap();
    assert_eq!(outcome.generation, None);
    assert!(outcome.snapshot.collections.is_empty());
}

#[test]
fn test_manager_discovers_generations() {
    let temp = TempDir::new().unwrap();
    {
        let mut manager = SnapshotManager::open(temp.path()).unwrap();
        manager.write(1, &sample_registry()).unwrap();
        manager.write(2, &sample_registry()).unwrap();
    }
    fs::write(temp.path().join("notes.txt"), b"ignored").unwrap();

    let manager = SnapshotManager::open(temp.path()).unwrap();
    assert_eq!(manager.generations().unwrap(), vec![2, 1]);
    assert_eq!(manager.next_generation(), 3);
}

#[test]
fn test_manager_falls_back_to_readable_generation() {
    let temp = TempDir::new().unwrap();
    let mut manager = SnapshotManager::open(temp.path()).unwrap();
    manager.write(4, &sample_registry()).unwrap();
    let (second, meta) = manager.write(8, &sample_registry()).unwrap();
    fs::write(&meta.path, b"garbage").unwrap();

    let outcome = manager.load(second).unwrap();

    assert_eq!(outcome.generation, Some(1));
    assert!(outcome.fell_back);
    assert_eq!(outcome.snapshot.last_seq, 4);
}

#[test]
fn test_manager_missing_preferred_generation() {
    let temp = TempDir::new().unwrap();
    let mut manager = SnapshotManager::open(temp.path()).unwrap();
    manager.write(4, &sample_registry()).unwrap();

    let outcome = manager.load(99).unwrap();
    assert_eq!(outcome.generation, Some(1));
    assert!(outcome.fell_back);
}

#[test]
fn test_manager_all_unreadable_is_error() {
    let temp = TempDir::new().unwrap();
    let mut manager = SnapshotManager::open(temp.path()).unwrap();
    let (generation, meta) = manager.write(4, &sample_registry()).unwrap();
    fs::write(&meta.path, b"garbage").unwrap();

    let err = manager.load(generation).unwrap_err();
    assert!(matches!(err, AtlasError::Format(_)));
}

#[test]
fn test_manager_ignores_unreadable_orphans_without_preference() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("snapshot_000003.snap"), b"half written").unwrap();

    let manager = SnapshotManager::open(temp.path()).unwrap();
    let outcome = manager.load(0).unwrap();

    assert_eq!(outcome.generation, None);
    assert_eq!(manager.next_generation(), 4);
}

#[test]
fn test_manager_remove_except() {
    let temp = TempDir::new().unwrap();
    let mut manager = SnapshotManager::open(temp.path()).unwrap();
    manager.write(1, &sample_registry()).unwrap();
    manager.write(2, &sample_registry()).unwrap();
    let (newest, _) = manager.write(3, &sample_registry()).unwrap();

    let removed = manager.remove_except(newest).unwrap();

    assert_eq!(removed, 2);
    assert_eq!(manager.generations().unwrap(), vec![newest]);
}

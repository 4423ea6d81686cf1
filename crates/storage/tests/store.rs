use cadop_core::Value;
use std::fs;
use std::time::Duration;
use storage::{load_csv, CsvOptions, DatasetStore, Encoding, LoadError, ReloadOutcome};

const HEADER: &str = "Registro_ANS;CNPJ;Razao_Social;Nome_Fantasia;Cidade;UF;DDD;Telefone\n";

fn registry(rows: &[&str]) -> String {
    let mut text = HEADER.to_string();
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

#[test]
fn loads_semicolon_registry() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("Relatorio_cadop.csv");
    fs::write(
        &path,
        registry(&[
            "419761;19541931000125;ALPHA SAUDE LTDA;ALPHA;São Paulo;SP;11;33334444",
            "326305;30226474000182;BETA ODONTO S.A.;;Rio de Janeiro;RJ;;",
        ]),
    )
    .unwrap();

    let loaded = load_csv(&path, &CsvOptions::default()).unwrap();
    assert_eq!(loaded.encoding, Encoding::Utf8);
    assert_eq!(loaded.dataset.len(), 2);
    let beta = &loaded.dataset.records()[1];
    assert_eq!(beta.get("Nome_Fantasia"), Some(&Value::Null));
    assert_eq!(beta.get("Cidade"), Some(&Value::from("Rio de Janeiro")));
    assert_eq!(
        loaded.dataset.records()[0].get("Telefone"),
        Some(&Value::from(33334444_i64))
    );
}

#[test]
fn falls_back_to_latin1() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("latin1.csv");
    let mut bytes = HEADER.as_bytes().to_vec();
    bytes.extend_from_slice(b"1;2;SA\xdaDE CAMPINAS;;Campinas;SP;19;1\n");
    fs::write(&path, bytes).unwrap();

    let loaded = load_csv(&path, &CsvOptions::default()).unwrap();
    assert_eq!(loaded.encoding, Encoding::Latin1);
    assert_eq!(
        loaded.dataset.records()[0].get("Razao_Social"),
        Some(&Value::from("SAÚDE CAMPINAS"))
    );
}

#[test]
fn missing_and_empty_files_are_errors() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("nope.csv");
    assert!(matches!(
        load_csv(&missing, &CsvOptions::default()),
        Err(LoadError::NotFound(_))
    ));

    let header_only = temp.path().join("header.csv");
    fs::write(&header_only, HEADER).unwrap();
    assert!(matches!(
        load_csv(&header_only, &CsvOptions::default()),
        Err(LoadError::Empty(_))
    ));
}

#[test]
fn store_starts_unavailable_when_file_missing() {
    let temp = tempfile::tempdir().unwrap();
    let store = DatasetStore::open(temp.path().join("later.csv"), CsvOptions::default());
    let snap = store.snapshot();
    assert!(!snap.is_available());
    assert!(snap.error().unwrap().contains("not found"));
    assert_eq!(snap.status().records_count, 0);
    assert!(snap.status().csv_status.starts_with("not loaded"));
}

#[test]
fn reload_swaps_snapshot_and_keeps_old_readers_intact() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("ops.csv");
    fs::write(&path, registry(&["1;1;ALPHA;;Santos;SP;13;1"])).unwrap();

    let store = DatasetStore::open(&path, CsvOptions::default());
    let before = store.snapshot();
    assert_eq!(before.dataset().len(), 1);
    assert!(before.fingerprint().is_some());

    assert_eq!(store.reload(), ReloadOutcome::Unchanged);

    fs::write(
        &path,
        registry(&["1;1;ALPHA;;Santos;SP;13;1", "2;2;BETA;;Santos;SP;13;2"]),
    )
    .unwrap();
    assert_eq!(store.reload(), ReloadOutcome::Replaced { records: 2 });

    // The snapshot taken earlier is untouched.
    assert_eq!(before.dataset().len(), 1);
    assert_eq!(store.snapshot().dataset().len(), 2);
}

#[test]
fn failed_reload_keeps_last_good_dataset() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("ops.csv");
    fs::write(&path, registry(&["1;1;ALPHA;;Santos;SP;13;1"])).unwrap();
    let store = DatasetStore::open(&path, CsvOptions::default());

    fs::remove_file(&path).unwrap();
    assert!(matches!(store.reload(), ReloadOutcome::Failed(_)));
    let snap = store.snapshot();
    assert!(snap.is_available());
    assert!(snap.error().is_some());
    assert!(snap.status().csv_status.contains("last reload failed"));

    fs::write(&path, HEADER).unwrap();
    assert!(matches!(store.reload(), ReloadOutcome::Failed(_)));
    assert_eq!(store.snapshot().dataset().len(), 1);

    fs::write(&path, registry(&["9;9;GAMA;;Santos;SP;13;1"])).unwrap();
    assert_eq!(store.reload(), ReloadOutcome::Replaced { records: 1 });
    assert!(store.snapshot().error().is_none());
}

#[test]
fn settled_reload_defers_while_file_is_being_written() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("ops.csv");
    fs::write(&path, registry(&["1;1;ALPHA;;Santos;SP;13;1"])).unwrap();
    let store = DatasetStore::open(&path, CsvOptions::default());

    // A partial write that still parses, followed by the rest of the file.
    fs::write(&path, registry(&["2;2;BETA;;Santos;SP;13;2"])).unwrap();
    let writer_path = path.clone();
    let writer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        fs::write(
            &writer_path,
            registry(&["2;2;BETA;;Santos;SP;13;2", "3;3;GAMA;;Santos;SP;13;3"]),
        )
        .unwrap();
    });

    assert_eq!(
        store.reload_settled(Duration::from_millis(400)),
        ReloadOutcome::Unsettled
    );
    writer.join().unwrap();
    let snap = store.snapshot();
    assert_eq!(snap.dataset().len(), 1);
    assert!(snap.error().is_none());

    assert_eq!(
        store.reload_settled(Duration::from_millis(10)),
        ReloadOutcome::Replaced { records: 2 }
    );
}

#[test]
fn settled_reload_of_a_stable_file_behaves_like_reload() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("ops.csv");
    fs::write(&path, registry(&["1;1;ALPHA;;Santos;SP;13;1"])).unwrap();
    let store = DatasetStore::open(&path, CsvOptions::default());

    let settle = Duration::from_millis(10);
    assert_eq!(store.reload_settled(settle), ReloadOutcome::Unchanged);

    fs::remove_file(&path).unwrap();
    assert!(matches!(store.reload_settled(settle), ReloadOutcome::Failed(_)));
    assert_eq!(store.snapshot().dataset().len(), 1);
}

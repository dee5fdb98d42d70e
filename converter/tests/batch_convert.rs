use pwc2arxiv::files::{find_in_directory, OutputMode};
use pwc2arxiv::{load_index, run_batch, ConvertSettings, IndexSource};
use pwc_core::BuildOptions;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const BACKUP: &str = r#"[
  {
    "paper_url": "https://paperswithcode.com/paper/attention-is-all-you-need",
    "paper_title": "Attention Is All You Need",
    "paper_arxiv_id": "1706.03762",
    "paper_url_abs": "https://arxiv.org/abs/1706.03762v5",
    "paper_url_pdf": "https://arxiv.org/pdf/1706.03762v5.pdf"
  },
  {
    "paper_url": "https://paperswithcode.com/paper/bert-pre-training-of-deep-bidirectional",
    "paper_title": "BERT: Pre-training of Deep Bidirectional Transformers",
    "paper_arxiv_id": "1810.04805",
    "paper_url_abs": "https://arxiv.org/abs/1810.04805v2",
    "paper_url_pdf": "https://arxiv.org/pdf/1810.04805v2.pdf"
  }
]"#;

const ATTENTION: &str = "https://paperswithcode.com/paper/attention-is-all-you-need";
const BERT: &str = "https://paperswithcode.com/paper/bert-pre-training-of-deep-bidirectional";

fn write_inputs(dir: &Path) {
    let files = [
        ("a.html", format!("<p><a href=\"{ATTENTION}\">Attention</a></p>\n<p>BERT: {BERT}</p>\n")),
        ("b.tex", format!("\\href{{{ATTENTION}}}{{Attention Paper}}\n\\url{{{BERT}}}\n")),
        ("c.rst", format!("`Attention Paper <{ATTENTION}>`_\n\nBERT: {BERT}\n")),
        ("d.json", format!("{{\n  \"papers\": [\"{ATTENTION}\", \"{BERT}\"]\n}}\n")),
        ("e.py", format!("# Reference: {ATTENTION}\nBERT_URL = '{BERT}'\n")),
        ("f.yml", format!("papers:\n  - url: \"{ATTENTION}\"\n  - url: {BERT}\n")),
    ];
    for (name, body) in files {
        fs::write(dir.join(name), body).unwrap();
    }
}

fn setup() -> (tempfile::TempDir, pwc_core::MappingIndex) {
    let dir = tempdir().unwrap();
    let backup = dir.path().join("backup.json");
    fs::write(&backup, BACKUP).unwrap();
    let index = load_index(&IndexSource::Json(backup), &BuildOptions::default()).unwrap();
    (dir, index)
}

#[test]
fn converts_every_format_the_same_way() {
    let (dir, index) = setup();
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    write_inputs(&docs);

    let inputs = find_in_directory(&docs, "*", false, Some("_arxiv")).unwrap();
    assert_eq!(inputs.len(), 6);
    let settings = ConvertSettings { output: OutputMode::Suffix("_arxiv".into()), dry_run: false };
    let batch = run_batch(&inputs, &index, &settings, false);

    assert_eq!(batch.failed(), 0);
    for file in &batch.files {
        assert_eq!(file.found, 2, "{}", file.input.display());
        assert_eq!(file.resolved, 2, "{}", file.input.display());
        assert!(file.not_found_list.is_none());
        let out = fs::read_to_string(file.output.as_ref().unwrap()).unwrap();
        assert!(!out.contains("paperswithcode.com"), "{out}");
        assert!(out.contains("https://arxiv.org/abs/1706.03762v5"));
        assert!(out.contains("https://arxiv.org/abs/1810.04805v2"));
    }

    let py = fs::read_to_string(docs.join("e_arxiv.py")).unwrap();
    assert_eq!(py, "# Reference: https://arxiv.org/abs/1706.03762v5\nBERT_URL = 'https://arxiv.org/abs/1810.04805v2'\n");
}

#[test]
fn unresolved_links_get_a_manual_lookup_list() {
    let (dir, index) = setup();
    let input = dir.path().join("notes.md");
    fs::write(&input, format!("- [a]({ATTENTION})\n- [b](https://paperswithcode.com/paper/unknown-slug-xyz)\n")).unwrap();

    let out_path = dir.path().join("out/converted.md");
    let settings = ConvertSettings { output: OutputMode::Explicit(out_path.clone()), dry_run: false };
    let batch = run_batch(&[input], &index, &settings, false);

    let report = &batch.files[0];
    assert_eq!(report.conversion_rate(), Some(50.0));
    assert_eq!(report.unresolved, vec!["https://paperswithcode.com/paper/unknown-slug-xyz".to_string()]);

    let list_path = dir.path().join("out/converted_not_found.txt");
    assert_eq!(report.not_found_list.as_deref(), Some(list_path.as_path()));
    let list = fs::read_to_string(list_path).unwrap();
    assert!(list.contains("Search term: Unknown Slug Xyz"));
    assert!(fs::read_to_string(out_path).unwrap().contains("https://arxiv.org/abs/1706.03762v5"));
}

#[test]
fn dry_run_writes_nothing() {
    let (dir, index) = setup();
    let input = dir.path().join("list.md");
    fs::write(&input, format!("{ATTENTION}\n")).unwrap();

    let settings = ConvertSettings { output: OutputMode::InPlace, dry_run: true };
    let batch = run_batch(&[input.clone()], &index, &settings, false);

    assert_eq!(batch.files[0].resolved, 1);
    assert!(batch.files[0].output.is_none());
    assert_eq!(fs::read_to_string(&input).unwrap(), format!("{ATTENTION}\n"));
}

#[test]
fn failure_stops_batch_unless_continuing() {
    let (dir, index) = setup();
    let bad = dir.path().join("bad.md");
    fs::write(&bad, [0xff, 0xfe, 0x00]).unwrap();
    let good = dir.path().join("good.md");
    fs::write(&good, format!("{BERT}\n")).unwrap();
    let inputs = vec![bad, good];
    let settings = ConvertSettings { output: OutputMode::Suffix("_arxiv".into()), dry_run: false };

    let stopped = run_batch(&inputs, &index, &settings, false);
    assert_eq!(stopped.files.len(), 1);
    assert!(stopped.stopped_early);
    assert!(stopped.files[0].error.as_deref().unwrap().contains("not valid UTF-8"));

    let continued = run_batch(&inputs, &index, &settings, true);
    assert_eq!(continued.succeeded(), 1);
    assert_eq!(continued.failed(), 1);
    assert!(dir.path().join("good_arxiv.md").is_file());
}

#[test]
fn missing_backup_is_reported_before_any_conversion() {
    let dir = tempdir().unwrap();
    let err = load_index(&IndexSource::Json(dir.path().join("missing.json")), &BuildOptions::default()).unwrap_err();
    assert!(err.to_string().contains("paperswithcode-data"));

    let bad = dir.path().join("bad.json");
    fs::write(&bad, "42").unwrap();
    let err = load_index(&IndexSource::Json(bad), &BuildOptions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("malformed dataset"));
}

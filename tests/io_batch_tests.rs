use std::fs;
use std::path::Path;
use tempfile::TempDir;
use volume_compare::batch::{BatchManifest, BatchRunner};
use volume_compare::config::{CompareOptions, Config, OutputLocators};
use volume_compare::data::{write_artifacts, RawVolumeCodec, VolumeLoader};
use volume_compare::report::{write_report, ComparisonReport};
use volume_compare::*;

fn write_scalar(dir: &Path, name: &str, volume: &ScalarVolume) {
    RawVolumeCodec::new()
        .write_scalar_file(volume, &dir.join(name))
        .unwrap();
}

fn write_labels(dir: &Path, name: &str, volume: &LabelVolume) {
    RawVolumeCodec::new()
        .write_label_file(volume, &dir.join(name))
        .unwrap();
}

#[test]
fn test_gzip_and_plain_files_load_the_same_volume() {
    let dir = TempDir::new().unwrap();
    let volume = ScalarVolume::from_fn(Extent::new(3, 4, 5), |[i, j, k]| (i + 2 * j + 3 * k) as f32 * 0.5);
    write_scalar(dir.path(), "plain.vol", &volume);
    write_scalar(dir.path(), "packed.vol.gz", &volume);

    let codec = RawVolumeCodec::new();
    let plain = codec.load_scalar(&dir.path().join("plain.vol")).unwrap();
    let packed = codec.load_scalar(&dir.path().join("packed.vol.gz")).unwrap();
    assert_eq!(plain, volume);
    assert_eq!(packed, volume);
}

#[test]
fn test_float_file_cannot_be_read_as_labels() {
    let dir = TempDir::new().unwrap();
    write_scalar(dir.path(), "image.vol", &ScalarVolume::filled(Extent::new(2, 2, 2), 1.0));
    write_labels(dir.path(), "labels.vol", &LabelVolume::filled(Extent::new(2, 2, 2), 3));

    let codec = RawVolumeCodec::new();
    assert!(codec.load_labels(&dir.path().join("image.vol")).is_err());
    // Label payloads widen when loaded as an image
    let widened = codec.load_scalar(&dir.path().join("labels.vol")).unwrap();
    assert_eq!(widened, ScalarVolume::filled(Extent::new(2, 2, 2), 3.0));
    assert!(codec.load_scalar(&dir.path().join("missing.vol")).is_err());
}

#[test]
fn test_options_load_and_artifacts_written() {
    let dir = TempDir::new().unwrap();
    let extent = Extent::new(2, 3, 3);
    write_scalar(dir.path(), "a.vol", &ScalarVolume::filled(extent, 4.0));
    write_scalar(dir.path(), "b.vol", &ScalarVolume::filled(extent, 1.0));
    write_labels(
        dir.path(),
        "mask.vol",
        &LabelVolume::from_fn(extent, |[i, _, _]| i as u16),
    );

    let mut options = CompareOptions::new(dir.path().join("a.vol"), dir.path().join("b.vol"));
    options.mask = Some(dir.path().join("mask.vol"));
    options.mask_label = 1;
    options.mask_value = -2.0;
    options.tolerance = ToleranceSpec::uniform(3.0);
    options.outputs = OutputLocators {
        masked_a: Some(dir.path().join("masked_a.vol")),
        masked_b: None,
        difference: Some(dir.path().join("diff.vol.gz")),
    };
    options.validate().unwrap();

    let codec = RawVolumeCodec::new();
    let inputs = options.load_inputs(&codec).unwrap();
    let mask = inputs.mask.as_ref().unwrap();
    assert_eq!(mask.mode, MaskMode::Inclusive);
    assert_eq!(mask.fill_value, -2.0);

    let outcome = ComparisonPipeline::new(options.tolerance).run(inputs).unwrap();
    assert!(outcome.verdict.passed);
    assert_eq!(outcome.verdict.summary.maximum, 3.0);
    assert_eq!(outcome.verdict.summary.minimum, 0.0);

    let written = write_artifacts(&codec, &outcome.artifacts, &options.outputs).unwrap();
    assert_eq!(written, 2);

    let masked_a = codec.load_scalar(&dir.path().join("masked_a.vol")).unwrap();
    assert_eq!(masked_a.get([0, 0, 0]), Some(&-2.0));
    assert_eq!(masked_a.get([1, 2, 2]), Some(&4.0));
    let diff = codec.load_scalar(&dir.path().join("diff.vol.gz")).unwrap();
    assert_eq!(diff, outcome.artifacts.difference);

    let report_path = dir.path().join("report.json");
    write_report(&ComparisonReport::new(&options, &outcome), &report_path).unwrap();
    let report: ComparisonReport =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report.verdict, outcome.verdict);
    assert_eq!(report.correlation_id, outcome.correlation_id);
}

#[test]
fn test_masked_output_without_mask_is_skipped() {
    let dir = TempDir::new().unwrap();
    let volume = ScalarVolume::filled(Extent::new(2, 2, 2), 1.0);
    let outcome = ComparisonPipeline::new(ToleranceSpec::default())
        .run(ComparisonInputs {
            image_a: volume.clone(),
            image_b: volume,
            mask: None,
        })
        .unwrap();

    let outputs = OutputLocators {
        masked_a: Some(dir.path().join("masked_a.vol")),
        masked_b: Some(dir.path().join("masked_b.vol")),
        difference: None,
    };
    let written = write_artifacts(&RawVolumeCodec::new(), &outcome.artifacts, &outputs).unwrap();
    assert_eq!(written, 0);
    assert!(!dir.path().join("masked_a.vol").exists());
}

#[test]
fn test_batch_manifest_end_to_end() {
    let dir = TempDir::new().unwrap();
    let extent = Extent::new(3, 3, 3);
    let base = ScalarVolume::from_fn(extent, |[i, j, k]| (i * 9 + j * 3 + k) as f32);
    let spiked = ScalarVolume::from_fn(extent, |c| {
        let v = (c[0] * 9 + c[1] * 3 + c[2]) as f32;
        if c == [1, 1, 1] {
            v + 10.0
        } else {
            v
        }
    });
    write_scalar(dir.path(), "base.vol", &base);
    write_scalar(dir.path(), "spiked.vol", &spiked);
    write_labels(
        dir.path(),
        "spot.vol",
        &LabelVolume::from_fn(extent, |c| u16::from(c == [1, 1, 1])),
    );

    let manifest_path = dir.path().join("regression.toml");
    fs::write(
        &manifest_path,
        r#"
[[case]]
name = "identical"
image_a = "base.vol"
image_b = "base.vol"

[[case]]
name = "spike"
image_a = "base.vol"
image_b = "spiked.vol"

[[case]]
name = "spike_masked"
image_a = "base.vol"
image_b = "spiked.vol"
mask = "spot.vol"
mask_outside = true
mask_label = 1
difference = "spike_masked_diff.vol"

[[case]]
name = "missing"
image_a = "base.vol"
image_b = "nowhere.vol"
"#,
    )
    .unwrap();

    let manifest = BatchManifest::load(&manifest_path).unwrap();
    let codec = RawVolumeCodec::new();
    let config = Config::default();
    let runner = BatchRunner::new(&codec, &codec, &config);
    let outcome = runner.run(&manifest, &manifest_path);

    let names: Vec<&str> = outcome.cases.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["identical", "spike", "spike_masked", "missing"]);

    let passed: Vec<bool> = outcome.cases.iter().map(|c| c.passed()).collect();
    assert_eq!(passed, vec![true, false, true, false]);
    assert!(outcome.cases[3].error.is_some());
    assert!(outcome.cases[3].to_string().starts_with("ERROR missing"));
    assert!(outcome.cases[1].to_string().starts_with("FAIL  spike"));
    assert_eq!(outcome.passed_count(), 2);
    assert!(!outcome.all_passed());

    // Every case gets its own correlation id
    let mut ids: Vec<_> = outcome.cases.iter().map(|c| c.correlation_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    assert!(dir.path().join("spike_masked_diff.vol").exists());
    assert!(runner.metrics().operations().contains(&"case_total".to_string()));
    assert!(outcome
        .stage_stats
        .iter()
        .any(|s| s.operation == "Statistics" && s.count == 3));
}

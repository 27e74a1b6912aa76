use grdcal::io::safe::{CALIBRATION_DIR, MEASUREMENT_DIR};
use grdcal::types::{Polarization, SarError};
use grdcal::{parse_radiometric_calibration_lut, parse_thermal_noise_removal_lut, SafeProduct};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::ZipWriter;

const SAFE_NAME: &str = "S1A_IW_GRDH_1SDV_20200103T170816_20200103T170841_030639_0382D5_6E3F.SAFE";

const NOISE_XML: &str = r#"<noise>
  <noiseRangeVectorList count="2">
    <noiseRangeVector><line>0</line><pixel>0 5 9</pixel><noiseRangeLut>3 2 1</noiseRangeLut></noiseRangeVector>
    <noiseRangeVector><line>7</line><pixel>0 5 9</pixel><noiseRangeLut>6 5 4</noiseRangeLut></noiseRangeVector>
  </noiseRangeVectorList>
</noise>"#;

const CALIBRATION_XML: &str = r#"<calibration>
  <calibrationVectorList count="1">
    <calibrationVector>
      <line>0</line>
      <pixel>0 9</pixel>
      <sigmaNought>500 510</sigmaNought>
      <betaNought>237 237</betaNought>
      <gamma>480 470</gamma>
    </calibrationVector>
  </calibrationVectorList>
</calibration>"#;

/// Zipped product: documents live below the `<name>.SAFE/` folder
fn write_archive(dir: &Path, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(SAFE_NAME.replace(".SAFE", ".zip"));
    let file = File::create(&path).expect("Failed to create archive");
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default();

    writer
        .add_directory(format!("{}/{}/", SAFE_NAME, CALIBRATION_DIR), options)
        .unwrap();
    for (name, content) in entries {
        writer
            .start_file(format!("{}/{}/{}", SAFE_NAME, CALIBRATION_DIR, name), options)
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer
        .start_file(format!("{}/manifest.safe", SAFE_NAME), options)
        .unwrap();
    writer.write_all(b"<manifest/>").unwrap();
    writer.finish().unwrap();

    path
}

#[test]
fn test_luts_from_zipped_product() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(
        dir.path(),
        &[
            ("noise-s1a-iw-grd-hh-001.xml", NOISE_XML),
            ("noise-s1a-iw-grd-hv-002.xml", NOISE_XML),
            ("calibration-s1a-iw-grd-hh-001.xml", CALIBRATION_XML),
            ("calibration-s1a-iw-grd-hv-002.xml", CALIBRATION_XML),
        ],
    );

    let product = SafeProduct::open(&archive).unwrap();
    assert!(product.is_archive());
    assert_eq!(product.list_dir(MEASUREMENT_DIR).unwrap(), None);

    let noise = parse_thermal_noise_removal_lut(&archive).unwrap();
    assert_eq!(noise.polarizations(), vec![Polarization::HH, Polarization::HV]);
    let hh = noise.get(Polarization::HH).unwrap();
    assert_eq!(hh.lines(), &[0, 7]);
    assert_eq!(hh.anchor_value(7, 5), Some(5.0));

    let gamma = parse_radiometric_calibration_lut(&archive, "gamma").unwrap();
    assert_eq!(gamma.get(Polarization::HV).unwrap().anchor_value(0, 9), Some(470.0));
}

#[test]
fn test_zipped_product_without_calibration_folder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.zip");
    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    writer
        .start_file(format!("{}/manifest.safe", SAFE_NAME), FileOptions::default())
        .unwrap();
    writer.write_all(b"<manifest/>").unwrap();
    writer.finish().unwrap();

    match parse_thermal_noise_removal_lut(&path) {
        Err(SarError::NotFound(msg)) => assert!(msg.contains("calibration folder missing")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_file_that_is_not_an_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("product.zip");
    std::fs::write(&path, "plain text").unwrap();

    let result = SafeProduct::open(&path);
    assert!(matches!(result, Err(SarError::InvalidFormat(_))));
}

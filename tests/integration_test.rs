use packerx::container::Container;
use packerx::engine::{self, DecompressPolicy};
use packerx::{namer, ContainerResolver, ErrorKind, PackError, Packer, PackerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _root:      TempDir,
    src:        PathBuf,
    compressed: PathBuf,
    restored:   PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let src        = root.path().join("src");
        let compressed = root.path().join("compressed_output");
        let restored   = root.path().join("decompressed_output");
        for dir in [&src, &compressed, &restored] {
            fs::create_dir(dir).unwrap();
        }
        Self { _root: root, src, compressed, restored }
    }

    fn config(&self) -> PackerConfig {
        PackerConfig {
            compressed_dir:   self.compressed.clone(),
            decompressed_dir: self.restored.clone(),
            ..PackerConfig::default()
        }
    }

    fn packer(&self) -> Packer {
        Packer::new(self.config())
    }

    fn source(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.src.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    fn count(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }
}

fn noise(len: usize) -> Vec<u8> {
    let mut seed = 0x1234_5678u32;
    (0..len)
        .map(|_| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 24) as u8
        })
        .collect()
}

#[test]
fn test_report_txt_scenario() {
    let fx = Fixture::new();
    let packer = fx.packer();
    let src = fx.source("report.txt", b"hello world");

    let packed = packer.compress_file(&src).unwrap();
    assert_eq!(packed.output_path, fx.compressed.join(format!("{}.bin", namer::name("report"))));
    assert_eq!(packed.hashed_name, namer::name("report").to_string());
    assert_eq!(packed.extension, "txt");
    assert_eq!(packed.original_size, 11);

    let container = Container::decode(&fs::read(&packed.output_path).unwrap()).unwrap();
    assert_eq!(container.extension, "txt");
    assert_eq!(container.checksum, 0x0d4a_1185);

    let restored = packer.decompress_file("report.txt").unwrap();
    assert_eq!(restored.output_path, fx.restored.join("report_restored.txt"));
    assert_eq!(fs::read(&restored.output_path).unwrap(), b"hello world");
    assert_eq!(restored.restored_size, 11);
}

#[test]
fn test_lookup_uses_stem_only() {
    let fx = Fixture::new();
    let packer = fx.packer();
    packer.compress_file(fx.source("report.txt", b"hello world")).unwrap();

    // Directory and extension of the argument are ignored; the stored one wins.
    let restored = packer.decompress_file("some/other/dir/report.md").unwrap();
    assert_eq!(restored.output_path, fx.restored.join("report_restored.txt"));
    assert_eq!(restored.extension, "txt");
}

#[test]
fn test_missing_extension_defaults_to_bin() {
    let fx = Fixture::new();
    let packer = fx.packer();
    let packed = packer.compress_file(fx.source("Makefile", b"all:\n\ttrue\n")).unwrap();
    assert_eq!(packed.extension, "bin");

    let restored = packer.decompress_file("Makefile").unwrap();
    assert_eq!(restored.output_path, fx.restored.join("Makefile_restored.bin"));
}

#[test]
fn test_roundtrip_binary_data() {
    let fx = Fixture::new();
    let packer = fx.packer();
    let data = noise(200_000);
    packer.compress_file(fx.source("blob.dat", &data)).unwrap();

    let restored = packer.decompress_file("blob.dat").unwrap();
    assert_eq!(fs::read(restored.output_path).unwrap(), data);
}

#[test]
fn test_recompress_replaces_container() {
    let fx = Fixture::new();
    let packer = fx.packer();
    packer.compress_file(fx.source("notes.txt", b"first version")).unwrap();
    packer.compress_file(fx.source("notes.txt", b"second version")).unwrap();
    assert_eq!(Fixture::count(&fx.compressed), 1);

    let restored = packer.decompress_file("notes.txt").unwrap();
    assert_eq!(fs::read(restored.output_path).unwrap(), b"second version");
}

#[test]
fn test_empty_source_is_input_error() {
    let fx = Fixture::new();
    let err = fx.packer().compress_file(fx.source("empty.txt", b"")).unwrap_err();
    assert!(matches!(err, PackError::FileEmpty { .. }));
    assert_eq!(err.kind(), ErrorKind::Input);
    assert_eq!(Fixture::count(&fx.compressed), 0);
}

#[test]
fn test_missing_source_is_input_error() {
    let fx = Fixture::new();
    let err = fx.packer().compress_file(fx.src.join("nope.txt")).unwrap_err();
    assert!(matches!(err, PackError::FileNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_missing_output_dir_is_write_error() {
    let fx = Fixture::new();
    let config = PackerConfig {
        compressed_dir: fx.compressed.join("does/not/exist"),
        ..fx.config()
    };
    let src = fx.source("report.txt", b"hello world");
    let err = Packer::new(config).compress_file(&src).unwrap_err();
    assert!(matches!(err, PackError::WriteError { .. }));
    assert_eq!(err.kind(), ErrorKind::Output);
}

#[test]
fn test_unknown_name_is_not_found() {
    let fx = Fixture::new();
    let err = fx.packer().decompress_file("never_packed.txt").unwrap_err();
    assert!(matches!(err, PackError::FileNotFound { .. }));
    assert_eq!(Fixture::count(&fx.restored), 0);
}

#[test]
fn test_short_container_is_format_error() {
    let fx = Fixture::new();
    let path = fx.compressed.join(namer::name("tiny").file_name());
    fs::write(&path, [3, b'a', b'b']).unwrap();

    let err = fx.packer().decompress_file("tiny.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert_eq!(Fixture::count(&fx.restored), 0);
}

#[test]
fn test_overlong_extension_is_format_error() {
    let fx = Fixture::new();
    let path = fx.compressed.join(namer::name("liar").file_name());
    fs::write(&path, [200, b'a', b'b', 0, 0, 0, 0, 0]).unwrap();

    let err = fx.packer().decompress_file("liar").unwrap_err();
    assert!(matches!(err, PackError::Format(_)));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_corrupted_checksum_is_integrity_error() {
    let fx = Fixture::new();
    let packer = fx.packer();
    let packed = packer.compress_file(fx.source("report.txt", b"hello world")).unwrap();

    let mut bytes = fs::read(&packed.output_path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    fs::write(&packed.output_path, &bytes).unwrap();

    let err = packer.decompress_file("report.txt").unwrap_err();
    assert!(matches!(err, PackError::IntegrityMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(!fx.restored.join("report_restored.txt").exists());
    assert_eq!(Fixture::count(&fx.restored), 0);
}

#[test]
fn test_payload_bit_flips_never_restore() {
    let fx = Fixture::new();
    let packer = fx.packer();
    let data = noise(4096);
    let packed = packer.compress_file(fx.source("blob.dat", &data)).unwrap();
    let original = fs::read(&packed.output_path).unwrap();

    // Payload region: after [len]["dat"], before the 4-byte checksum.
    let payload = 4..original.len() - 4;
    for pos in payload.step_by(97) {
        for bit in [0u8, 3, 7] {
            let mut bytes = original.clone();
            bytes[pos] ^= 1 << bit;
            fs::write(&packed.output_path, &bytes).unwrap();

            let err = packer.decompress_file("blob.dat").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Integrity, "byte {pos} bit {bit}: {err}");
            assert_eq!(Fixture::count(&fx.restored), 0);
        }
    }
}

/// Repetitive text sized so its compression ratio sits just under the 8x the
/// default policy can restore.
fn text_near_policy_limit() -> Vec<u8> {
    let line = b"Quarterly report: revenue up, costs down, outlook stable.\n";
    let text = |n: usize| line.iter().copied().cycle().take(n).collect::<Vec<u8>>();
    let ratio = |n: usize| n as f64 / engine::compress(&text(n)).unwrap().payload.len() as f64;

    let mut best = None;
    for n in (200..=8000).step_by(10) {
        if ratio(n) >= 7.9 {
            break;
        }
        best = Some(n);
    }
    let n = best.unwrap();
    assert!(ratio(n) > 6.0, "ratio {} at {} bytes", ratio(n), n);
    text(n)
}

#[test]
fn test_every_payload_bit_flip_in_huffman_stream() {
    let fx = Fixture::new();
    let packer = fx.packer();
    let data = text_near_policy_limit();
    let packed = packer.compress_file(fx.source("report.txt", &data)).unwrap();
    let original = fs::read(&packed.output_path).unwrap();

    // Sanity: the intact container restores under the default policy.
    let restored = packer.decompress_file("report.txt").unwrap();
    assert_eq!(fs::read(&restored.output_path).unwrap(), data);
    fs::remove_file(&restored.output_path).unwrap();

    // Payload region: after [len]["txt"], up to and including the last payload byte.
    for pos in 4..original.len() - 4 {
        for bit in 0..8 {
            let mut bytes = original.clone();
            bytes[pos] ^= 1 << bit;
            fs::write(&packed.output_path, &bytes).unwrap();

            match packer.decompress_file("report.txt") {
                // Deflate padding bits after the final block are not covered
                // by any check; flipping them yields the original bytes.
                Ok(report) => {
                    assert_eq!(fs::read(&report.output_path).unwrap(), data, "byte {pos} bit {bit}");
                    fs::remove_file(&report.output_path).unwrap();
                }
                Err(err) => {
                    assert_eq!(err.kind(), ErrorKind::Integrity, "byte {pos} bit {bit}: {err}");
                    assert_eq!(Fixture::count(&fx.restored), 0);
                }
            }
        }
    }
}

#[test]
fn test_damaged_oversized_stream_is_integrity_error() {
    let fx = Fixture::new();
    let packer = fx.packer();
    let packed = packer.compress_file(fx.source("zeros.img", &vec![0u8; 1 << 20])).unwrap();

    // Last payload byte belongs to the adler-32 trailer.
    let mut bytes = fs::read(&packed.output_path).unwrap();
    let pos = bytes.len() - 5;
    bytes[pos] ^= 0x01;
    fs::write(&packed.output_path, &bytes).unwrap();

    let err = packer.decompress_file("zeros.img").unwrap_err();
    assert!(matches!(err, PackError::PayloadCorrupt { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(Fixture::count(&fx.restored), 0);
}

#[test]
fn test_inspect_reports_metadata_without_writing() {
    let fx = Fixture::new();
    let packer = fx.packer();
    let packed = packer.compress_file(fx.source("report.txt", b"hello world")).unwrap();

    let info = packer.inspect("report").unwrap();
    assert_eq!(info.path, packed.output_path);
    assert_eq!(info.hashed_name, packed.hashed_name);
    assert_eq!(info.extension, "txt");
    assert_eq!(info.checksum, 0x0d4a_1185);
    assert_eq!(info.format_version, 1);
    assert_eq!(info.container_len, packed.container_size);
    assert_eq!(info.payload_len, packed.container_size - 1 - 3 - 4);
    assert_eq!(Fixture::count(&fx.restored), 0);

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["extension"], "txt");
}

#[test]
fn test_policy_limits_restore_of_extreme_ratio() {
    let fx = Fixture::new();
    let zeros = vec![0u8; 1 << 20];
    let src = fx.source("zeros.img", &zeros);
    fx.packer().compress_file(&src).unwrap();

    let err = fx.packer().decompress_file("zeros.img").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transform);
    assert_eq!(Fixture::count(&fx.restored), 0);

    let wide = PackerConfig {
        decompress: DecompressPolicy { initial_multiplier: 4, growth_factor: 4, max_retries: 6 },
        ..fx.config()
    };
    let restored = Packer::new(wide).decompress_file("zeros.img").unwrap();
    assert_eq!(fs::read(restored.output_path).unwrap(), zeros);
}

struct FixedResolver(PathBuf);

impl ContainerResolver for FixedResolver {
    fn resolve_container_path(&self, _stem: &str) -> PathBuf {
        self.0.clone()
    }
}

#[test]
fn test_custom_resolver() {
    let fx = Fixture::new();
    let target = fx.compressed.join("store.bin");
    let packer = Packer::with_resolver(fx.config(), Box::new(FixedResolver(target.clone())));

    let packed = packer.compress_file(fx.source("report.txt", b"hello world")).unwrap();
    assert_eq!(packed.output_path, target);

    let restored = packer.decompress_file("report.txt").unwrap();
    assert_eq!(fs::read(restored.output_path).unwrap(), b"hello world");
}

#[test]
fn test_config_from_json_falls_back_to_defaults() {
    let config = PackerConfig::from_json_slice(br#"{ "decompress": { "max_retries": 3 } }"#).unwrap();
    assert_eq!(config.compressed_dir, PathBuf::from("compressed_output"));
    assert_eq!(config.decompressed_dir, PathBuf::from("decompressed_output"));
    assert_eq!(config.decompress.max_retries, 3);
    assert_eq!(config.decompress.initial_multiplier, 4);
    assert_eq!(config.decompress.growth_factor, 2);
}

#[test]
fn test_config_from_json_file() {
    let fx = Fixture::new();
    let path = fx.src.join("packerx.json");
    fs::write(&path, r#"{ "compressed_dir": "/tmp/store" }"#).unwrap();
    let config = PackerConfig::from_json_file(&path).unwrap();
    assert_eq!(config.compressed_dir, PathBuf::from("/tmp/store"));

    fs::write(&path, "not json").unwrap();
    assert!(PackerConfig::from_json_file(&path).is_err());
}

use std::io::{Cursor, SeekFrom, Write};

use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use memzip::io::ingest;
use memzip::zip::list_entries;
use memzip::{
    ArchiveScanner, ArchiveSource, BufferError, BufferOptions, ChunkedBuffer, ScanError,
    StreamView, certificate_data, file_data,
};

fn build_zip(entries: &[(&str, &[u8], CompressionMethod)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in entries {
        let options = SimpleFileOptions::default().compression_method(*method);
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn buffer_of(bytes: &[u8], block_size: usize) -> ChunkedBuffer {
    ingest(
        &mut Cursor::new(bytes),
        BufferOptions::new().block_size(block_size),
        13,
    )
    .unwrap()
}

fn crc_of(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Local header followed by `body`; sizes and CRC as given.
fn local_entry(
    name: &str,
    flags: u16,
    method: u16,
    crc: u32,
    csize: u32,
    usize_: u32,
    body: &[u8],
) -> Vec<u8> {
    local_entry_raw(name.as_bytes(), flags, method, crc, csize, usize_, body)
}

fn local_entry_raw(
    name: &[u8],
    flags: u16,
    method: u16,
    crc: u32,
    csize: u32,
    usize_: u32,
    body: &[u8],
) -> Vec<u8> {
    let mut out = Vec::from(&b"PK\x03\x04"[..]);
    out.extend_from_slice(&20u16.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&method.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&csize.to_le_bytes());
    out.extend_from_slice(&usize_.to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(body);
    out
}

/// Deflated entry whose sizes follow the data in a descriptor.
fn streamed_entry(name: &str, payload: &[u8], signed_descriptor: bool) -> Vec<u8> {
    let compressed = deflate(payload);
    let mut out = local_entry(name, 0x0008, 8, 0, 0, 0, &compressed);
    if signed_descriptor {
        out.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
    }
    out.extend_from_slice(&crc_of(payload).to_le_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out
}

fn stored_entry(name: &str, payload: &[u8]) -> Vec<u8> {
    stored_entry_raw(name.as_bytes(), payload)
}

fn stored_entry_raw(name: &[u8], payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u32;
    local_entry_raw(name, 0, 0, crc_of(payload), len, len, payload)
}

fn sample_apk() -> Vec<u8> {
    build_zip(&[
        ("AndroidManifest.xml", b"<manifest/>", CompressionMethod::Deflated),
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n", CompressionMethod::Deflated),
        ("META-INF/CERT.SF", b"Signature-Version: 1.0\r\n", CompressionMethod::Stored),
        ("META-INF/CERT.RSA", b"\x30\x82\x01\x0a certificate bytes", CompressionMethod::Stored),
        ("classes.dex", b"dex\n035\0 dalvik bytecode", CompressionMethod::Deflated),
    ])
}

#[test]
fn finds_certificate_and_named_entries() {
    let mut buffer = buffer_of(&sample_apk(), 64);

    assert_eq!(
        certificate_data(&mut buffer).unwrap().unwrap(),
        b"\x30\x82\x01\x0a certificate bytes"
    );
    assert_eq!(
        file_data(&mut buffer, "classes.dex").unwrap().unwrap(),
        b"dex\n035\0 dalvik bytecode"
    );
    assert_eq!(
        file_data(&mut buffer, "AndroidManifest.xml").unwrap().unwrap(),
        b"<manifest/>"
    );
    assert!(file_data(&mut buffer, "missing.txt").unwrap().is_none());
}

#[test]
fn path_match_is_exact() {
    let mut buffer = buffer_of(&sample_apk(), 64);

    assert!(file_data(&mut buffer, "CLASSES.DEX").unwrap().is_none());
    assert!(file_data(&mut buffer, "classes").unwrap().is_none());
    assert!(file_data(&mut buffer, "/classes.dex").unwrap().is_none());
}

#[test]
fn first_certificate_in_stream_order_wins() {
    let zip = build_zip(&[
        ("META-INF/ZZZ.dsa", b"dsa first", CompressionMethod::Deflated),
        ("META-INF/AAA.RSA", b"rsa second", CompressionMethod::Stored),
        ("META-INF/KEY.EC", b"ec third", CompressionMethod::Stored),
    ]);
    let mut buffer = buffer_of(&zip, 16);

    assert_eq!(certificate_data(&mut buffer).unwrap().unwrap(), b"dsa first");
}

#[test]
fn ec_entries_are_not_certificates() {
    let zip = build_zip(&[
        ("META-INF/KEY.EC", b"ec", CompressionMethod::Stored),
        ("META-INF/CERT.RSA", b"rsa", CompressionMethod::Stored),
    ]);
    let mut buffer = buffer_of(&zip, 16);

    assert_eq!(certificate_data(&mut buffer).unwrap().unwrap(), b"rsa");
}

#[test]
fn archive_without_certificate_reports_absence() {
    let zip = build_zip(&[
        ("a.txt", b"alpha", CompressionMethod::Stored),
        ("META-INF/signer.ec", b"ec", CompressionMethod::Stored),
    ]);
    let mut buffer = buffer_of(&zip, 16);

    assert!(certificate_data(&mut buffer).unwrap().is_none());
}

#[test]
fn non_utf8_name_is_not_found_by_its_lossy_form() {
    let mut archive = stored_entry_raw(b"res/bad\xFF.txt", b"payload");
    archive.extend(stored_entry("res/good.txt", b"fine"));
    let mut buffer = buffer_of(&archive, 16);

    assert!(file_data(&mut buffer, "res/bad\u{FFFD}.txt").unwrap().is_none());
    assert_eq!(file_data(&mut buffer, "res/good.txt").unwrap().unwrap(), b"fine");

    let entries = list_entries(&mut buffer).unwrap();
    assert_eq!(entries[0].raw_name, b"res/bad\xFF.txt");
}

#[test]
fn repeated_queries_are_independent() {
    let mut buffer = buffer_of(&sample_apk(), 32);

    let first = file_data(&mut buffer, "classes.dex").unwrap();
    // Leave the cursor somewhere arbitrary between queries.
    buffer.seek(SeekFrom::Start(17)).unwrap();
    let second = file_data(&mut buffer, "classes.dex").unwrap();
    assert_eq!(first, second);

    let cert_a = certificate_data(&mut buffer).unwrap();
    let cert_b = certificate_data(&mut buffer).unwrap();
    assert_eq!(cert_a, cert_b);
    assert!(cert_a.is_some());
}

#[test]
fn scanner_reuses_one_view() {
    let mut buffer = buffer_of(&sample_apk(), 8);
    let mut view = StreamView::borrowing(&mut buffer).unwrap();
    let mut scanner = ArchiveScanner::new(&mut view);

    assert!(scanner.find_entry("META-INF/CERT.SF").unwrap().is_some());
    assert!(scanner.find_certificate_entry().unwrap().is_some());
    assert!(scanner.find_entry("META-INF/CERT.SF").unwrap().is_some());

    let names: Vec<_> = scanner
        .list_entries()
        .unwrap()
        .into_iter()
        .map(|e| e.file_name)
        .collect();
    assert_eq!(
        names,
        [
            "AndroidManifest.xml",
            "META-INF/MANIFEST.MF",
            "META-INF/CERT.SF",
            "META-INF/CERT.RSA",
            "classes.dex"
        ]
    );
}

#[test]
fn large_entry_spans_many_blocks() {
    let payload: Vec<u8> = (0..300_000u32).map(|i| (i * 31 % 251) as u8).collect();
    let zip = build_zip(&[
        ("assets/big.bin", &payload, CompressionMethod::Deflated),
        ("assets/raw.bin", &payload[..100_000], CompressionMethod::Stored),
        ("META-INF/CERT.RSA", b"cert", CompressionMethod::Stored),
    ]);
    let mut buffer = buffer_of(&zip, 4096);
    assert!(buffer.block_count() > 1);

    assert_eq!(file_data(&mut buffer, "assets/big.bin").unwrap().unwrap(), payload);
    assert_eq!(
        file_data(&mut buffer, "assets/raw.bin").unwrap().unwrap(),
        &payload[..100_000]
    );
    assert_eq!(certificate_data(&mut buffer).unwrap().unwrap(), b"cert");
}

#[test]
fn data_descriptor_entries_are_skipped_and_read() {
    let mut archive = streamed_entry("lib/first.so", b"first streamed payload", true);
    archive.extend(streamed_entry("lib/second.so", &[42u8; 5000], false));
    archive.extend(stored_entry("META-INF/cert.rsa", b"cert after streams"));
    archive.extend_from_slice(b"PK\x01\x02");

    let mut buffer = buffer_of(&archive, 100);

    assert_eq!(
        certificate_data(&mut buffer).unwrap().unwrap(),
        b"cert after streams"
    );
    assert_eq!(
        file_data(&mut buffer, "lib/second.so").unwrap().unwrap(),
        vec![42u8; 5000]
    );
    assert_eq!(
        file_data(&mut buffer, "lib/first.so").unwrap().unwrap(),
        b"first streamed payload"
    );

    let entries = list_entries(&mut buffer).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1].uncompressed_size, 5000);
    assert_eq!(entries[1].crc32, crc_of(&[42u8; 5000]));
}

#[test]
fn truncated_archive_is_malformed_not_missing() {
    let zip = build_zip(&[
        ("one.txt", &[1u8; 400], CompressionMethod::Stored),
        ("two.txt", &[2u8; 400], CompressionMethod::Stored),
        ("three.txt", &[3u8; 400], CompressionMethod::Stored),
    ]);
    let cut = &zip[..600];
    let mut buffer = buffer_of(cut, 64);

    assert_eq!(file_data(&mut buffer, "one.txt").unwrap().unwrap(), vec![1u8; 400]);
    assert!(file_data(&mut buffer, "two.txt").unwrap_err().is_decode());
    assert!(file_data(&mut buffer, "three.txt").unwrap_err().is_decode());
    assert!(certificate_data(&mut buffer).unwrap_err().is_decode());
}

#[test]
fn corrupt_deflate_stream_is_malformed() {
    let garbage = [0xFFu8; 32];
    let mut archive = local_entry("bad.bin", 0, 8, 0, garbage.len() as u32, 10, &garbage);
    archive.extend(stored_entry("good.txt", b"fine"));
    let mut buffer = buffer_of(&archive, 16);

    match file_data(&mut buffer, "bad.bin") {
        Err(ScanError::Decode { offset, .. }) => assert!(offset > 0),
        other => panic!("expected decode failure, got {other:?}"),
    }
    // Known-size entries are skipped without inflating them.
    assert_eq!(file_data(&mut buffer, "good.txt").unwrap().unwrap(), b"fine");
}

#[test]
fn encrypted_entry_cannot_be_read() {
    let archive = local_entry("secret.RSA", 0x0001, 0, 0, 4, 4, b"abcd");
    let mut buffer = buffer_of(&archive, 16);

    assert!(certificate_data(&mut buffer).unwrap_err().is_decode());
}

#[test]
fn closed_buffer_is_a_buffer_error() {
    let mut buffer = buffer_of(&sample_apk(), 64);
    buffer.close();

    match certificate_data(&mut buffer) {
        Err(ScanError::Buffer(BufferError::Closed)) => {}
        other => panic!("expected closed buffer, got {other:?}"),
    }
}

#[test]
fn pinned_buffer_still_scans_after_close() {
    let zip = sample_apk();
    let mut buffer = ingest(&mut Cursor::new(&zip), BufferOptions::new().pinned(), 1024).unwrap();
    buffer.close();

    assert!(file_data(&mut buffer, "classes.dex").unwrap().is_some());
}

#[test]
fn archive_source_round_trip() {
    let zip = sample_apk();
    let mut source = ArchiveSource::from_reader_with(
        Cursor::new(&zip),
        BufferOptions::new().block_size(50),
        7,
    )
    .unwrap();

    assert_eq!(source.len(), zip.len());
    assert!(source.certificate_data().unwrap().is_some());
    assert!(source.file_data("classes.dex").unwrap().is_some());
    assert_eq!(source.entries().unwrap().len(), 5);

    let mut copy = Vec::new();
    source.write_to(&mut copy).unwrap();
    assert_eq!(copy, zip);
}

#[test]
fn archive_source_from_file_and_append() {
    let dir = std::env::temp_dir().join(format!("memzip-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("in.apk");
    let output = dir.join("out.apk");
    let _ = std::fs::remove_file(&output);

    let zip = sample_apk();
    std::fs::write(&input, &zip).unwrap();

    let mut source = ArchiveSource::open(&input, BufferOptions::new().block_size(128)).unwrap();
    assert_eq!(
        source.file_data("AndroidManifest.xml").unwrap().unwrap(),
        b"<manifest/>"
    );

    source.append_to_file(&output).unwrap();
    source.append_to_file(&output).unwrap();
    let written = std::fs::read(&output).unwrap();
    assert_eq!(written.len(), 2 * zip.len());
    assert_eq!(&written[..zip.len()], &zip[..]);

    std::fs::remove_dir_all(&dir).unwrap();
}

use super::*;
use crate::descriptor::{DeclFlags, FunctionDescriptor, PackageDescriptor, TypeDescriptor};
use crate::proto::encode_package;
use cinterop_ir::UniqId;
use pretty_assertions::assert_eq;

fn package(name: &str, functions: &[&str]) -> PackageDescriptor {
    let mut p = PackageDescriptor::new(name);
    for f in functions {
        p.functions.push(FunctionDescriptor {
            name: (*f).to_owned(),
            flags: DeclFlags::PUBLIC | DeclFlags::EXTERNAL,
            uniq_id: UniqId::public(f.len() as u64),
            type_parameters: vec![],
            receiver: None,
            value_parameters: vec![],
            return_type: TypeDescriptor::class("lang/Unit", None),
            annotations: vec![],
        });
    }
    p
}

fn writer() -> LibraryWriter {
    let mut manifest = Manifest::new();
    manifest.set(Manifest::INTEROP, "true");
    manifest.set_list(
        Manifest::EXPORT_FORWARD_DECLARATIONS,
        ["cnames.structs.Opaque"],
    );
    LibraryWriter::new("sqlite")
        .add_fragment(PackageFragment::empty(""))
        .add_fragment(encode_package(&package("sqlite", &["sqlite3_open"])))
        .add_manifest(&manifest)
        .add_link_dependency("stdlib")
}

#[test]
fn test_commit_and_read_manifest_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sqlite.klib");

    writer().commit(&path).unwrap();

    let descriptor = read_descriptor(&path).unwrap();
    assert_eq!(descriptor.module_name, "sqlite");
    assert_eq!(descriptor.fragment_names, vec!["".to_owned(), "sqlite".to_owned()]);
    let manifest = read_manifest(&path).unwrap();
    assert_eq!(manifest.unique_name(), Some("sqlite"));
    assert_eq!(
        manifest.export_forward_declarations(),
        vec!["cnames.structs.Opaque"]
    );
    assert_eq!(manifest.depends(), vec!["stdlib"]);
    assert_eq!(manifest.get(Manifest::ABI_VERSION), Some("1"));
}

#[test]
fn test_open_decodes_fragments_lazily() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib.klib");
    writer().commit(&path).unwrap();

    let library = Library::open(&path).unwrap();
    assert_eq!(library.fragment_count(), 2);
    assert!(library.fragments.iter().all(|c| c.get().is_none()));

    let fragment = library.fragment(1).unwrap();
    assert_eq!(fragment.fq_name, "sqlite");
    assert!(!fragment.is_empty);
    assert!(library.fragments[0].get().is_none());
    assert!(library.fragment(0).unwrap().is_empty);

    let decoded = fragment.decoder().package().unwrap();
    assert_eq!(decoded, package("sqlite", &["sqlite3_open"]));
    assert!(matches!(
        library.fragment(5),
        Err(KlibError::NoSuchFragment(5))
    ));
}

#[test]
fn test_native_section() {
    let bytes = writer()
        .add_native_object(vec![0x7f, b'E', b'L', b'F'])
        .add_native_library("sqlite3")
        .to_bytes()
        .unwrap();
    let library = Library::from_bytes(Path::new("mem.klib"), bytes).unwrap();
    let native = library.native_section().unwrap().unwrap();
    assert_eq!(native.object, vec![0x7f, b'E', b'L', b'F']);
    assert_eq!(native.link_libraries, vec!["sqlite3".to_owned()]);

    let plain = Library::from_bytes(Path::new("mem.klib"), writer().to_bytes().unwrap()).unwrap();
    assert_eq!(plain.native_section().unwrap(), None);
}

#[test]
fn test_corruption_is_detected() {
    let mut bytes = writer().to_bytes().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    let err = Library::from_bytes(Path::new("bad.klib"), bytes).unwrap_err();
    assert!(matches!(err, KlibError::ChecksumMismatch { .. }));
}

#[test]
fn test_bad_magic_and_truncation() {
    let mut bytes = writer().to_bytes().unwrap();
    bytes[0] = b'X';
    assert!(matches!(
        Library::from_bytes(Path::new("x"), bytes),
        Err(KlibError::BadMagic { .. })
    ));

    let mut bytes = writer().to_bytes().unwrap();
    bytes.truncate(bytes.len() - 3);
    assert!(matches!(
        Library::from_bytes(Path::new("x"), bytes),
        Err(KlibError::Truncated { .. })
    ));

    assert!(matches!(
        Library::from_bytes(Path::new("x"), vec![0; 4]),
        Err(KlibError::Truncated { .. })
    ));
}

#[test]
fn test_failed_commit_leaves_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    // The destination is an existing directory, so the rename fails.
    let path = dir.path().join("taken");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("keep"), b"x").unwrap();

    let err = writer().commit(&path).unwrap_err();
    assert!(matches!(err, KlibError::Io { .. }));

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("taken")]);
}

#[test]
fn test_staged_file_is_invisible_until_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/glue.c");

    let staged = StagedFile::stage(&path, b"int x;").unwrap();
    assert_eq!(staged.path(), path.as_path());
    assert!(!path.exists());
    staged.persist().unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"int x;".to_vec());

    drop(StagedFile::stage(&dir.path().join("out/dropped.c"), b"").unwrap());
    let mut names: Vec<_> = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    names.sort();
    assert_eq!(names, vec![std::ffi::OsString::from("glue.c")]);
}

#[test]
fn test_header_layout() {
    let header = Header {
        magic: MAGIC,
        version: FORMAT_VERSION,
        checksum: 0xdead_beef,
        descriptor_len: 10,
        fragments_len: 20,
        native_len: 0,
    };
    let bytes = header.to_bytes();
    assert_eq!(&bytes[0..4], b"CIKL");
    assert_eq!(Header::from_bytes(&bytes), header);
}

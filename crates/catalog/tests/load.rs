//! Loading catalogs from disk.

use std::fs;

use pretty_assertions::assert_eq;
use wiring::Injector;
use wiring_catalog::{Catalog, CatalogError, Record};

#[test]
fn test_load_from_file() {
	let dir = tempfile::tempdir().expect("tempdir");
	let path = dir.path().join("greeter.toml");
	fs::write(
		&path,
		r#"
[[class]]
name = "hello.Greeter"

[[class.constructor]]
args = [{ type = "String", parameter = "hello.Greeting" }]

[[parameter]]
name = "hello.Greeting"
type = "String"
default = "hi"
"#,
	)
	.expect("write catalog");

	let catalog = Catalog::load(&path).expect("catalog loads");
	let injector = Injector::new(catalog.configuration().expect("configuration"));
	let greeter = injector.get_instance("hello.Greeter").expect("greeter");
	let greeter = greeter.downcast::<Record>().expect("record");
	assert_eq!(greeter.field("hello.Greeting").and_then(|v| v.as_str()), Some("hi"));
}

#[test]
fn test_load_missing_file() {
	let dir = tempfile::tempdir().expect("tempdir");
	let path = dir.path().join("absent.toml");
	match Catalog::load(&path) {
		Err(CatalogError::Read { path: reported, .. }) => assert_eq!(reported, path),
		other => panic!("expected read error, got {other:?}"),
	}
}

#[test]
fn test_load_malformed_file() {
	let dir = tempfile::tempdir().expect("tempdir");
	let path = dir.path().join("broken.toml");
	fs::write(&path, "[[class]\nname = ").expect("write catalog");
	assert!(matches!(Catalog::load(&path), Err(CatalogError::Parse(_))));
}

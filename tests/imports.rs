use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use test_utils::run_file;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("conch-import-tests-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn imported_definitions_are_visible() {
    let dir = temp_dir("visible");
    write_file(&dir, "lib.cnch", "(x: int) -> int { return x + 1; } bump;");
    let main = write_file(&dir, "main.cnch", "import \"lib.cnch\"; println bump(41);");
    let (stdout, exit, diagnostic) = run_file(&main);
    assert_eq!(exit, 0, "{diagnostic:?}");
    assert_eq!(stdout, "42\n");
}

#[test]
fn transitive_imports_resolve() {
    let dir = temp_dir("transitive");
    write_file(&dir, "base.cnch", "int base = 40;");
    write_file(&dir, "mid.cnch", "import \"base.cnch\"; int extra = base + 1;");
    let main = write_file(&dir, "main.cnch", "import \"mid.cnch\"; println extra + 1;");
    let (stdout, exit, diagnostic) = run_file(&main);
    assert_eq!(exit, 0, "{diagnostic:?}");
    assert_eq!(stdout, "42\n");
}

#[test]
fn import_cycles_abort_parsing() {
    let dir = temp_dir("cycle");
    write_file(&dir, "a.cnch", "import \"b.cnch\";");
    write_file(&dir, "b.cnch", "import \"a.cnch\";");
    let main = write_file(&dir, "main.cnch", "import \"a.cnch\";");
    let (_, exit, diagnostic) = run_file(&main);
    assert_eq!(exit, 1);
    assert!(diagnostic.unwrap().to_string().contains("cycle"));
}

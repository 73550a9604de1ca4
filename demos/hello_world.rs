use std::io::{Read, Write};

use winfs_kit::{FileAccess, FileMode, FileShare, MockFileSystem, SearchOption};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fs = MockFileSystem::new();

    // creates `C:\Docs` and makes it the current directory
    fs.directory().create_directory("C:\\Docs")?;
    fs.directory().set_current_directory("c:\\docs")?;

    // relative names resolve against the current directory
    let mut first = fs.file().create("first.txt")?;
    first.write_all(b"Hello")?;
    println!("created {}", first.path());
    drop(first);

    // rooted-relative names resolve against the current drive
    fs.add_file("\\second.txt", b"World")?;
    assert!(fs.file().exists("C:\\SECOND.TXT"));

    let mut text = String::new();
    fs.file()
        .open("c:\\docs\\FIRST.txt", FileMode::Open, FileAccess::Read, FileShare::READ)?
        .read_to_string(&mut text)?;
    text.push_str(", ");
    fs.file()
        .open("c:\\second.txt", FileMode::Open, FileAccess::Read, FileShare::READ)?
        .read_to_string(&mut text)?;
    println!("{text}!");

    for path in fs.directory().enumerate_files("c:\\", "*.txt", SearchOption::AllDirectories)? {
        println!("found {path}");
    }

    // errors carry the same text Windows would show
    fs.directory().set_current_directory("c:\\")?;
    if let Err(err) = fs.directory().delete("c:\\docs", false) {
        println!("delete failed: {err}");
    }
    fs.directory().delete("c:\\docs", true)?;
    assert!(!fs.directory().exists("c:\\docs"));
    Ok(())
}

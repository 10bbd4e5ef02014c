use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use shmcon::{Config, Console, SharedSegment};

fn unique(tag: &str) -> String {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    format!(
        "shmcon-con-{}-{}-{}",
        tag,
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

fn run(script: &str, prompt: Option<&str>) -> (String, String) {
    let mut console: Console<Vec<u8>, Vec<u8>> = Console::new(Vec::new(), Vec::new());
    console.run(Cursor::new(script), prompt).unwrap();
    assert!(!console.segment().is_mapped());
    (
        String::from_utf8(console.out().clone()).unwrap(),
        String::from_utf8(console.err().clone()).unwrap(),
    )
}

#[test]
fn write_then_read_back() {
    let name = unique("rw");
    let script = format!("create {name} 0x10\nwrite 2 1 0x22 017 256\nread 0 8\nquit\n");
    let (out, err) = run(&script, None);
    assert_eq!(out, "0x00 0x00 0x01 0x22 0x0f 0x00 0x00 0x00\n");
    assert_eq!(err, "");
}

#[test]
fn read_stops_at_segment_end() {
    let name = unique("end");
    let script = format!("create {name} 4\nwrite 2 7 8 9 10\nread 1 100\nread 4 1\nread 99 1\n");
    let (out, err) = run(&script, None);
    assert_eq!(out, "0x00 0x07 0x08\n\n\n");
    assert_eq!(err, "");
}

#[test]
fn second_console_opens_first_segment() {
    let name = unique("two");
    let mut first: Console<Vec<u8>, Vec<u8>> = Console::new(Vec::new(), Vec::new());
    first.execute(&format!("create {name} 8")).unwrap();
    first.execute("write 0 1 2 3 4 5 6 7 8").unwrap();

    let mut second: Console<Vec<u8>, Vec<u8>> = Console::new(Vec::new(), Vec::new());
    second.execute(&format!("open {name} 8")).unwrap();
    second.execute("read 0 8").unwrap();
    assert_eq!(
        String::from_utf8_lossy(second.out()),
        "0x01 0x02 0x03 0x04 0x05 0x06 0x07 0x08\n"
    );
}

#[test]
fn fill_clamps_and_reports() {
    let name = unique("fill");
    let script = format!("create {name} 6\nfill 4 10 0xab\nread 0 6\nfill 7 1 1\n");
    let (out, err) = run(&script, None);
    assert_eq!(out, "2 bytes written\n0x00 0x00 0x00 0x00 0xab 0xab\n");
    assert_eq!(err, "invalid argument: offset is out of range\n");
}

#[test]
fn info_reports_mapping() {
    let name = unique("info");
    let script = format!("create {name} 32\ninfo\nclose\ninfo\n");
    let (out, _) = run(&script, None);
    assert_eq!(
        out,
        format!("name  : /{name}\nsize  : 32\nowner : yes\nnot mapped\n")
    );
}

#[test]
fn platform_errors_go_to_stderr() {
    let name = unique("nothere");
    let (out, err) = run(&format!("open {name} 8\n"), None);
    assert_eq!(out, "");
    assert!(err.starts_with("No such file or directory (os error"));
}

#[test]
fn unlink_command_removes_name() {
    let name = unique("unlink");
    let mut holder = SharedSegment::new();
    holder.create(&name, 8).unwrap();

    let (_, err) = run(&format!("unlink {name}\nopen {name} 8\n"), None);
    assert!(err.starts_with("No such file or directory"));
}

#[test]
fn quit_stops_reading() {
    let (out, _) = run("args a\nq\nargs b\n", Some("> "));
    assert_eq!(out, "> [0]args\n[1]a\n> ");
}

#[test]
fn end_of_input_stops_loop() {
    let (out, err) = run("help", Some("$ "));
    assert!(out.starts_with("$ "));
    assert!(out.ends_with("$ "));
    assert!(out.contains("Print help message."));
    assert_eq!(err, "");
}

#[test]
fn write_usage_and_not_opened() {
    let name = unique("usage");
    let script = format!("write 0 1\ncreate {name} 4\nwrite 0\nread 1\n");
    let (out, err) = run(&script, None);
    assert_eq!(err, "Not opened.\n");
    assert_eq!(
        out,
        "usage:\n  write offset# data1# [ data2# [ ... ] ]\nusage:\n  read offset# length#\n"
    );
}

#[test]
fn invalid_utf8_line_does_not_end_session() {
    let mut console: Console<Vec<u8>, Vec<u8>> = Console::new(Vec::new(), Vec::new());
    console
        .run(Cursor::new(&b"args \xff\nargs ok\n"[..]), None)
        .unwrap();
    assert_eq!(
        String::from_utf8(console.out().clone()).unwrap(),
        "[0]args\n[1]\u{fffd}\n[0]args\n[1]ok\n"
    );
}

#[test]
fn create_after_open_in_console() {
    let name = unique("reuse");
    let mut holder = SharedSegment::new();
    holder.create(&name, 8).unwrap();
    holder.write_byte(0, 0x11);

    let script = format!("open {name} 8\nread 0 1\ncreate {name} 8\nread 0 1\ninfo\n");
    let (out, err) = run(&script, None);
    assert_eq!(err, "");
    assert_eq!(
        out,
        format!("0x11\n0x00\nname  : /{name}\nsize  : 8\nowner : no\n")
    );
}

#[test]
fn quit_among_startup_commands_stops_early() {
    let config = Config::parse_from([
        "shmcon", "-c", "args a", "-c", "quit", "-c", "args b",
    ]);
    let mut console: Console<Vec<u8>, Vec<u8>> = Console::new(Vec::new(), Vec::new());
    let flow = console.run_commands(&config.commands).unwrap();
    assert!(flow.is_break());
    assert_eq!(
        String::from_utf8(console.out().clone()).unwrap(),
        "[0]args\n[1]a\n"
    );
}

#[test]
fn startup_commands_without_quit_continue() {
    let name = unique("startup");
    let create = format!("create {name} 4");
    let config = Config::parse_from(["shmcon", "-c", create.as_str(), "-c", "write 0 9"]);
    let mut console: Console<Vec<u8>, Vec<u8>> = Console::new(Vec::new(), Vec::new());
    assert!(console.run_commands(&config.commands).unwrap().is_continue());
    assert_eq!(console.segment().read_byte(0), Some(9));
}

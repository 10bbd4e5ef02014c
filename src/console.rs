use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;

use tracing::{debug, trace};

use crate::number::{parse_byte, parse_usize};
use crate::segment::SharedSegment;
use crate::token::split_tokens;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Create,
    Open,
    Close,
    Read,
    Write,
    Fill,
    Info,
    Flush,
    Unlink,
    Args,
    Help,
    Quit,
}

struct CommandEntry {
    name: &'static str,
    command: Command,
    description: &'static str,
}

const fn entry(name: &'static str, command: Command, description: &'static str) -> CommandEntry {
    CommandEntry {
        name,
        command,
        description,
    }
}

// Entries without a description are aliases and stay out of `help`.
const COMMANDS: &[CommandEntry] = &[
    entry("create", Command::Create, "Create shared memory."),
    entry("open", Command::Open, "Open shared memory."),
    entry("close", Command::Close, "Close shared memory."),
    entry("read", Command::Read, "Read from shared memory."),
    entry("write", Command::Write, "Write onto shared memory."),
    entry("fill", Command::Fill, "Fill a range of shared memory."),
    entry("info", Command::Info, "Print the mapped segment."),
    entry("flush", Command::Flush, "Flush shared memory."),
    entry("unlink", Command::Unlink, "Remove a named shared memory."),
    entry("args", Command::Args, "Print arguments."),
    entry("help", Command::Help, "Print help message."),
    entry("quit", Command::Quit, "Quit application."),
    entry("q", Command::Quit, ""),
];

/// Line oriented front end for a [`SharedSegment`].
///
/// Regular output goes to `out`, diagnostics to `err`.
pub struct Console<O, E> {
    segment: SharedSegment,
    out: O,
    err: E,
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Console {
            segment: SharedSegment::new(),
            out,
            err,
        }
    }

    pub fn segment(&self) -> &SharedSegment {
        &self.segment
    }

    pub fn out(&self) -> &O {
        &self.out
    }

    pub fn err(&self) -> &E {
        &self.err
    }

    /// Reads and executes lines until `quit` or end of input, then closes the
    /// segment. `prompt` is printed before every line when given.
    ///
    /// Lines that are not valid UTF-8 are decoded lossily rather than ending
    /// the session.
    pub fn run<R: BufRead>(&mut self, mut input: R, prompt: Option<&str>) -> io::Result<()> {
        let mut line = Vec::new();
        let mut running = true;
        while running {
            if let Some(prompt) = prompt {
                write!(self.out, "{}", prompt)?;
                self.out.flush()?;
            }
            line.clear();
            if input.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            running = self.execute(&String::from_utf8_lossy(&line))?.is_continue();
        }
        self.segment.close();
        Ok(())
    }

    /// Executes `lines` in order, stopping at the first `quit`.
    pub fn run_commands<I>(&mut self, lines: I) -> io::Result<ControlFlow<()>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            if self.execute(line.as_ref())?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Executes a single command line.
    pub fn execute(&mut self, line: &str) -> io::Result<ControlFlow<()>> {
        let args = split_tokens(line);
        let Some(name) = args.first() else {
            return Ok(ControlFlow::Continue(()));
        };
        let Some(entry) = COMMANDS.iter().find(|e| e.name == name.as_str()) else {
            writeln!(self.err, "Unknown command : {}", name)?;
            return Ok(ControlFlow::Continue(()));
        };
        debug!(command = entry.name, argc = args.len() - 1, "dispatch");

        match entry.command {
            Command::Create => self.create_command(&args)?,
            Command::Open => self.open_command(&args)?,
            Command::Close => self.segment.close(),
            Command::Read => self.read_command(&args)?,
            Command::Write => self.write_command(&args)?,
            Command::Fill => self.fill_command(&args)?,
            Command::Info => self.info_command()?,
            Command::Flush => {
                if let Err(err) = self.segment.flush() {
                    writeln!(self.err, "{}", err)?;
                }
            }
            Command::Unlink => self.unlink_command(&args)?,
            Command::Args => {
                for (i, arg) in args.iter().enumerate() {
                    writeln!(self.out, "[{}]{}", i, arg)?;
                }
            }
            Command::Help => {
                for e in COMMANDS.iter().filter(|e| !e.description.is_empty()) {
                    writeln!(self.out, "{:>16} - {}", e.name, e.description)?;
                }
            }
            Command::Quit => return Ok(ControlFlow::Break(())),
        }
        self.out.flush()?;
        Ok(ControlFlow::Continue(()))
    }

    fn create_command(&mut self, args: &[String]) -> io::Result<()> {
        if args.len() < 3 {
            return self.usage("create name$ size#");
        }
        let result = self.segment.create(&args[1], parse_usize(&args[2]));
        if let Err(err) = result {
            writeln!(self.err, "{}", err)?;
        }
        Ok(())
    }

    fn open_command(&mut self, args: &[String]) -> io::Result<()> {
        if args.len() < 3 {
            return self.usage("open name$ size#");
        }
        let result = self.segment.open(&args[1], parse_usize(&args[2]));
        if let Err(err) = result {
            writeln!(self.err, "{}", err)?;
        }
        Ok(())
    }

    fn read_command(&mut self, args: &[String]) -> io::Result<()> {
        if !self.segment.is_mapped() {
            return writeln!(self.err, "Not opened.");
        }
        if args.len() < 3 {
            return self.usage("read offset# length#");
        }
        let offset = parse_usize(&args[1]);
        let length = parse_usize(&args[2]);
        let segment = &self.segment;
        let data: Vec<u8> = (0..length)
            .map_while(|i| offset.checked_add(i).and_then(|o| segment.read_byte(o)))
            .collect();
        trace!(offset, requested = length, read = data.len(), "read");
        writeln!(self.out, "{}", hex_line(&data))
    }

    fn write_command(&mut self, args: &[String]) -> io::Result<()> {
        if !self.segment.is_mapped() {
            return writeln!(self.err, "Not opened.");
        }
        if args.len() < 3 {
            return self.usage("write offset# data1# [ data2# [ ... ] ]");
        }
        let offset = parse_usize(&args[1]);
        for (i, arg) in args[2..].iter().enumerate() {
            if let Some(o) = offset.checked_add(i) {
                self.segment.write_byte(o, parse_byte(arg));
            }
        }
        Ok(())
    }

    fn fill_command(&mut self, args: &[String]) -> io::Result<()> {
        if !self.segment.is_mapped() {
            return writeln!(self.err, "Not opened.");
        }
        if args.len() < 4 {
            return self.usage("fill offset# length# data#");
        }
        let offset = parse_usize(&args[1]);
        // Never more than the segment can hold.
        let length = parse_usize(&args[2]).min(self.segment.size());
        let data = vec![parse_byte(&args[3]); length];
        match self.segment.write_range(offset, &data) {
            Ok(n) => writeln!(self.out, "{} bytes written", n),
            Err(err) => writeln!(self.err, "{}", err),
        }
    }

    fn info_command(&mut self) -> io::Result<()> {
        match self.segment.name() {
            Some(name) => {
                writeln!(self.out, "name  : {}", name)?;
                writeln!(self.out, "size  : {}", self.segment.size())?;
                let owner = if self.segment.is_owner() { "yes" } else { "no" };
                writeln!(self.out, "owner : {}", owner)
            }
            None => writeln!(self.out, "not mapped"),
        }
    }

    fn unlink_command(&mut self, args: &[String]) -> io::Result<()> {
        if args.len() < 2 {
            return self.usage("unlink name$");
        }
        if let Err(err) = SharedSegment::unlink(&args[1]) {
            writeln!(self.err, "{}", err)?;
        }
        Ok(())
    }

    fn usage(&mut self, synopsis: &str) -> io::Result<()> {
        writeln!(self.out, "usage:")?;
        writeln!(self.out, "  {}", synopsis)
    }
}

/// Renders bytes as `0x..` values separated by single spaces.
pub fn hex_line(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:#04x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

use std::str::FromStr;

use interval_metronome_core::{MetronomeError, RhythmSegment, SegmentField};

pub const HELP: &str = "\
commands:
  start                      start, or resume when paused
  pause                      pause and keep the elapsed time
  stop                       stop and reset the elapsed time
  add [MINUTES BPM]          append a segment (defaults from config)
  remove N                   remove segment N
  set N duration|bpm VALUE   change a field of segment N
  list                       show the segments
  status                     show the current status
  help                       show this help
  quit                       leave the program";

/// A line typed at the interactive prompt. Segment numbers are 1-based on
/// input and converted to indices here.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Stop,
    Add(Option<RhythmSegment>),
    Remove(usize),
    Set {
        index: usize,
        field: SegmentField,
        value: f64,
    },
    List,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = MetronomeError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Err(parse_error(line, "empty command"));
        };

        let command = match (verb.to_ascii_lowercase().as_str(), args) {
            ("start" | "resume" | "s", []) => Self::Start,
            ("pause" | "p", []) => Self::Pause,
            ("stop" | "x", []) => Self::Stop,
            ("add" | "a", []) => Self::Add(None),
            ("add" | "a", [segment]) => Self::Add(Some(segment.parse()?)),
            ("add" | "a", [minutes, bpm]) => {
                Self::Add(Some(format!("{minutes}x{bpm}").parse()?))
            }
            ("remove" | "rm", [number]) => Self::Remove(segment_index(number)?),
            ("set", [number, field, value]) => Self::Set {
                index: segment_index(number)?,
                field: field.parse()?,
                value: value
                    .parse()
                    .map_err(|_| parse_error(value, "value is not a number"))?,
            },
            ("list" | "ls", []) => Self::List,
            ("status" | "st", []) => Self::Status,
            ("help" | "h" | "?", []) => Self::Help,
            ("quit" | "exit" | "q", []) => Self::Quit,
            _ => return Err(parse_error(line, "unknown command, type `help`")),
        };
        Ok(command)
    }
}

fn segment_index(number: &str) -> Result<usize, MetronomeError> {
    match number.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(parse_error(number, "segment numbers start at 1")),
    }
}

fn parse_error(input: &str, reason: &'static str) -> MetronomeError {
    MetronomeError::Parse {
        input: input.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_commands() {
        assert_eq!("start".parse::<Command>().unwrap(), Command::Start);
        assert_eq!("  Pause ".parse::<Command>().unwrap(), Command::Pause);
        assert_eq!("stop".parse::<Command>().unwrap(), Command::Stop);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn parses_segment_edits() {
        assert_eq!("add".parse::<Command>().unwrap(), Command::Add(None));
        assert_eq!(
            "add 5 170".parse::<Command>().unwrap(),
            Command::Add(Some(RhythmSegment::new(5.0, 170.0)))
        );
        assert_eq!(
            "add 2.5x90".parse::<Command>().unwrap(),
            Command::Add(Some(RhythmSegment::new(2.5, 90.0)))
        );
        assert_eq!("remove 2".parse::<Command>().unwrap(), Command::Remove(1));
        assert_eq!(
            "set 1 bpm 175".parse::<Command>().unwrap(),
            Command::Set {
                index: 0,
                field: SegmentField::Bpm,
                value: 175.0
            }
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
        assert!("remove 0".parse::<Command>().is_err());
        assert!("remove two".parse::<Command>().is_err());
        assert!("set 1 bpm fast".parse::<Command>().is_err());
        assert!("set 1 colour 3".parse::<Command>().is_err());
        assert!("start now".parse::<Command>().is_err());
    }
}

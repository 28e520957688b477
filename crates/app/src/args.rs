use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use study_core::model::{ChunkId, ExamId, SubjectId, UserId, VideoId};

pub const DEFAULT_DB_URL: &str = "sqlite://study.sqlite3";

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTarget {
    Video(VideoId),
    Chunk(ChunkId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NewExam { name: String, description: String },
    NewSubject { exam: ExamId, name: String, goal_minutes: u32 },
    SetKey { key: String },
    SetGoal { hours: f64 },
    AddPlaylist { subject: SubjectId, url: String },
    AddVideo { subject: SubjectId, url: String },
    ImportCsv { subject: SubjectId, path: PathBuf },
    Split { video: VideoId, minutes: u32 },
    Watch { target: WatchTarget, watched: bool },
    Focus { subject: SubjectId, minutes: u32 },
    Progress { subject: Option<SubjectId> },
    Analytics,
    DeleteExam { exam: ExamId },
    DeleteSubject { subject: SubjectId },
    DeletePlaylist { subject: SubjectId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub db_url: String,
    pub user: UserId,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage: app <command> [--db <sqlite_url>] [--user <id>] ...");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  new-exam <name> [--description <text>]");
    eprintln!("  new-subject --exam <id> <name> [--goal-minutes <n>]");
    eprintln!("  set-key <api_key>");
    eprintln!("  set-goal --hours <h>");
    eprintln!("  add-playlist --subject <id> <playlist_url>");
    eprintln!("  add-video --subject <id> <video_url>");
    eprintln!("  import-csv --subject <id> <path>");
    eprintln!("  split --video <id> --minutes <n>");
    eprintln!("  watch (--video <id> | --chunk <id>) [--undo]");
    eprintln!("  focus --subject <id> --minutes <n>");
    eprintln!("  progress [--subject <id>]");
    eprintln!("  analytics");
    eprintln!("  delete-exam --exam <id>");
    eprintln!("  delete-subject --subject <id>");
    eprintln!("  delete-playlist --subject <id>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL (default {DEFAULT_DB_URL}), STUDY_USER_ID (default 1)");
    eprintln!("  STUDY_CATALOG_API_KEY, STUDY_CATALOG_BASE_URL, RUST_LOG");
}

#[derive(Default)]
struct Flags {
    exam: Option<ExamId>,
    subject: Option<SubjectId>,
    video: Option<VideoId>,
    chunk: Option<ChunkId>,
    minutes: Option<u32>,
    goal_minutes: Option<u32>,
    hours: Option<f64>,
    description: Option<String>,
    undo: bool,
    positional: Vec<String>,
}

impl Flags {
    fn take_positional(&mut self, what: &'static str) -> Result<String, ArgsError> {
        if self.positional.is_empty() {
            return Err(ArgsError::MissingArg { what });
        }
        Ok(self.positional.remove(0))
    }

    fn finish(self) -> Result<(), ArgsError> {
        match self.positional.into_iter().next() {
            Some(extra) => Err(ArgsError::UnknownArg(extra)),
            None => Ok(()),
        }
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_value<T: FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let raw = require_value(args, flag)?;
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn required<T>(value: Option<T>, what: &'static str) -> Result<T, ArgsError> {
    value.ok_or(ArgsError::MissingArg { what })
}

impl Args {
    /// Parse the process arguments (without the program name). `Ok(None)` means help
    /// was requested.
    pub fn parse(argv: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter();
        let name = match args.next() {
            None => return Ok(None),
            Some(first) if matches!(first.as_str(), "--help" | "-h" | "help") => return Ok(None),
            Some(first) => first,
        };

        let mut db_url = std::env::var("STUDY_DB_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut user = std::env::var("STUDY_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or_else(|| UserId::new(1));

        let mut flags = Flags::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => user = parse_value(&mut args, "--user")?,
                "--exam" => flags.exam = Some(parse_value(&mut args, "--exam")?),
                "--subject" => flags.subject = Some(parse_value(&mut args, "--subject")?),
                "--video" => flags.video = Some(parse_value(&mut args, "--video")?),
                "--chunk" => flags.chunk = Some(parse_value(&mut args, "--chunk")?),
                "--minutes" => flags.minutes = Some(parse_value(&mut args, "--minutes")?),
                "--goal-minutes" => {
                    flags.goal_minutes = Some(parse_value(&mut args, "--goal-minutes")?);
                }
                "--hours" => flags.hours = Some(parse_value(&mut args, "--hours")?),
                "--description" => {
                    flags.description = Some(require_value(&mut args, "--description")?);
                }
                "--undo" => flags.undo = true,
                "--help" | "-h" => return Ok(None),
                other if other.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => flags.positional.push(arg),
            }
        }

        let command = build_command(&name, &mut flags)?;
        flags.finish()?;
        Ok(Some(Self {
            db_url,
            user,
            command,
        }))
    }
}

fn build_command(name: &str, flags: &mut Flags) -> Result<Command, ArgsError> {
    let command = match name {
        "new-exam" => Command::NewExam {
            name: flags.take_positional("exam name")?,
            description: flags.description.take().unwrap_or_default(),
        },
        "new-subject" => Command::NewSubject {
            exam: required(flags.exam, "--exam")?,
            name: flags.take_positional("subject name")?,
            goal_minutes: flags.goal_minutes.unwrap_or(0),
        },
        "set-key" => Command::SetKey {
            key: flags.take_positional("API key")?,
        },
        "set-goal" => Command::SetGoal {
            hours: required(flags.hours, "--hours")?,
        },
        "add-playlist" => Command::AddPlaylist {
            subject: required(flags.subject, "--subject")?,
            url: flags.take_positional("playlist URL")?,
        },
        "add-video" => Command::AddVideo {
            subject: required(flags.subject, "--subject")?,
            url: flags.take_positional("video URL")?,
        },
        "import-csv" => Command::ImportCsv {
            subject: required(flags.subject, "--subject")?,
            path: PathBuf::from(flags.take_positional("CSV path")?),
        },
        "split" => Command::Split {
            video: required(flags.video, "--video")?,
            minutes: required(flags.minutes, "--minutes")?,
        },
        "watch" => {
            let target = match (flags.video, flags.chunk) {
                (Some(video), None) => WatchTarget::Video(video),
                (None, Some(chunk)) => WatchTarget::Chunk(chunk),
                _ => return Err(ArgsError::MissingArg { what: "exactly one of --video or --chunk" }),
            };
            Command::Watch {
                target,
                watched: !flags.undo,
            }
        }
        "focus" => Command::Focus {
            subject: required(flags.subject, "--subject")?,
            minutes: required(flags.minutes, "--minutes")?,
        },
        "progress" => Command::Progress {
            subject: flags.subject,
        },
        "analytics" => Command::Analytics,
        "delete-exam" => Command::DeleteExam {
            exam: required(flags.exam, "--exam")?,
        },
        "delete-subject" => Command::DeleteSubject {
            subject: required(flags.subject, "--subject")?,
        },
        "delete-playlist" => Command::DeletePlaylist {
            subject: required(flags.subject, "--subject")?,
        },
        other => return Err(ArgsError::UnknownCommand(other.to_owned())),
    };
    Ok(command)
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path = std::path::Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<Args>, ArgsError> {
        Args::parse(line.split_whitespace().map(str::to_owned))
    }

    #[test]
    fn parses_watch_with_undo() {
        let args = parse("watch --chunk 4 --undo --user 9").unwrap().unwrap();
        assert_eq!(args.user, UserId::new(9));
        assert_eq!(
            args.command,
            Command::Watch {
                target: WatchTarget::Chunk(ChunkId::new(4)),
                watched: false,
            }
        );
    }

    #[test]
    fn flags_may_precede_positionals() {
        let args = parse("add-playlist --subject 2 https://youtube.com/playlist?list=PL1")
            .unwrap()
            .unwrap();
        assert_eq!(
            args.command,
            Command::AddPlaylist {
                subject: SubjectId::new(2),
                url: "https://youtube.com/playlist?list=PL1".into(),
            }
        );
    }

    #[test]
    fn reports_missing_and_bad_values() {
        assert!(matches!(
            parse("split --video 3"),
            Err(ArgsError::MissingArg { what: "--minutes" })
        ));
        assert!(matches!(
            parse("split --video x --minutes 5"),
            Err(ArgsError::InvalidNumber { flag: "--video", .. })
        ));
        assert!(matches!(parse("watch"), Err(ArgsError::MissingArg { .. })));
        assert!(matches!(parse("teleport"), Err(ArgsError::UnknownCommand(_))));
        assert!(matches!(
            parse("set-key abc def"),
            Err(ArgsError::UnknownArg(extra)) if extra == "def"
        ));
    }

    #[test]
    fn parses_delete_and_analytics_commands() {
        assert_eq!(
            parse("delete-exam --exam 5").unwrap().unwrap().command,
            Command::DeleteExam {
                exam: ExamId::new(5)
            }
        );
        assert_eq!(
            parse("delete-playlist --subject 8").unwrap().unwrap().command,
            Command::DeletePlaylist {
                subject: SubjectId::new(8)
            }
        );
        assert_eq!(
            parse("analytics --user 2").unwrap().unwrap().command,
            Command::Analytics
        );
        assert!(matches!(
            parse("delete-subject"),
            Err(ArgsError::MissingArg { what: "--subject" })
        ));
        assert!(matches!(
            parse("analytics extra"),
            Err(ArgsError::UnknownArg(extra)) if extra == "extra"
        ));
    }

    #[test]
    fn help_and_empty_input_print_usage() {
        assert!(parse("").unwrap().is_none());
        assert!(parse("--help").unwrap().is_none());
    }

    #[test]
    fn keeps_explicit_sqlite_urls() {
        assert_eq!(
            normalize_sqlite_url("sqlite://already/there.db".into()),
            "sqlite://already/there.db"
        );
        assert!(normalize_sqlite_url("sqlite:rel.db".into()).ends_with("/rel.db"));
    }
}

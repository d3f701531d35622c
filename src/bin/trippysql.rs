//! trippySQL is an interactive shell for the trippySQL parser. It reads
//! statements line by line, parses them, and prints the resulting AST or the
//! parse error. Command history is stored in .trippysql.history.

#![warn(clippy::all)]

use std::path::PathBuf;

use clap::Parser as _;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Editor, Modifiers};
use rustyline_derive::{Completer, Helper, Highlighter, Hinter};
use serde::Deserialize;

use trippysql::errinput;
use trippysql::error::Result;
use trippysql::sql::parser::{has_open_quote, Ast, Lexer};
use trippysql::Parser;

fn main() {
    if let Err(error) = Command::parse().run() {
        eprintln!("Error: {error}");
    }
}

/// The trippySQL command.
#[derive(clap::Parser)]
#[command(about = "A trippySQL statement parser.", version, propagate_version = true)]
struct Command {
    /// A SQL statement to parse, then exit.
    #[arg()]
    statement: Option<String>,
    /// The configuration file path.
    #[arg(short = 'c', long, default_value = "trippysql.yaml")]
    config: String,
    /// The AST output format, overriding the configuration.
    #[arg(short = 'f', long, value_enum)]
    format: Option<Format>,
}

impl Command {
    /// Runs the command.
    fn run(self) -> Result<()> {
        let cfg = Config::load(&self.config)?;

        let loglevel = cfg.log_level.parse::<simplelog::LevelFilter>()?;
        let mut logconfig = simplelog::ConfigBuilder::new();
        if loglevel < simplelog::LevelFilter::Debug {
            logconfig.add_filter_allow_str("trippysql");
        }
        simplelog::SimpleLogger::init(loglevel, logconfig.build())?;

        let mut shell = Shell::new(self.format.unwrap_or(cfg.format), cfg.history)?;
        match self.statement {
            Some(statement) => shell.execute(&statement),
            None => shell.run(),
        }
    }
}

/// The shell configuration.
#[derive(Debug, Deserialize)]
struct Config {
    log_level: String,
    format: Format,
    history: bool,
}

impl Config {
    /// Loads the configuration from defaults, the given file (if it exists),
    /// and TRIPPYSQL_ environment variables, in increasing priority.
    fn load(file: &str) -> Result<Self> {
        Ok(config::Config::builder()
            .set_default("log_level", "warn")?
            .set_default("format", "debug")?
            .set_default("history", true)?
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix("TRIPPYSQL"))
            .build()?
            .try_deserialize()?)
    }
}

/// An AST output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
enum Format {
    /// Pretty-printed Rust debug output.
    Debug,
    /// Pretty-printed JSON.
    Json,
    /// The canonical SQL statement.
    Sql,
}

impl Format {
    /// Formats an AST.
    fn format(&self, ast: &Ast) -> Result<String> {
        Ok(match self {
            Self::Debug => format!("{ast:#?}"),
            Self::Json => serde_json::to_string_pretty(ast)?,
            Self::Sql => ast.to_string(),
        })
    }
}

impl TryFrom<&str> for Format {
    type Error = trippysql::Error;

    fn try_from(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "json" => Ok(Self::Json),
            "sql" => Ok(Self::Sql),
            _ => errinput!("unknown format {value}"),
        }
    }
}

/// An interactive trippySQL shell.
struct Shell {
    /// The Rustyline command editor.
    editor: Editor<InputValidator, DefaultHistory>,
    /// The path to the history file, if any.
    history_path: Option<PathBuf>,
    /// The AST output format.
    format: Format,
}

impl Shell {
    /// Creates a new shell. If history is enabled, it's stored in the user's
    /// home directory.
    fn new(format: Format, history: bool) -> Result<Self> {
        // Set up Rustyline. Make sure multiline pastes are handled normally.
        let mut editor = Editor::new()?;
        editor.set_helper(Some(InputValidator));
        editor.bind_sequence(
            rustyline::KeyEvent(rustyline::KeyCode::BracketedPasteStart, Modifiers::NONE),
            rustyline::Cmd::Noop,
        );
        let history_path = std::env::var_os("HOME")
            .filter(|_| history)
            .map(|home| PathBuf::from(home).join(".trippysql.history"));
        Ok(Self { editor, history_path, format })
    }

    /// Executes a SQL statement or ! command.
    fn execute(&mut self, input: &str) -> Result<()> {
        if input.starts_with('!') {
            self.execute_command(input)
        } else if !input.is_empty() {
            self.execute_sql(input)
        } else {
            Ok(())
        }
    }

    /// Executes a trippySQL ! command (e.g. !help). Arguments are the rest of
    /// the line after the command, which may be a statement.
    fn execute_command(&mut self, input: &str) -> Result<()> {
        let (command, args) = match input.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (input, ""),
        };

        match (command, args) {
            // Displays help.
            ("!help", "") => println!(
                r#"
Enter a SQL statement to parse it and display its AST, or Ctrl-D to exit.
Statements end at the end of the line, unless a quoted value is still open.
The following commands are also available:

    !format FORMAT     Sets the AST output format (debug, json or sql)
    !help              This help message
    !tokens STATEMENT  Displays the lexical tokens of a statement
"#
            ),
            ("!help", _) => return errinput!("!help takes no arguments"),

            // Sets the output format.
            ("!format", "") => return errinput!("!format takes 1 argument"),
            ("!format", format) => {
                self.format = Format::try_from(format)?;
                println!("Format set to {format}");
            }

            // Displays the token stream.
            ("!tokens", "") => return errinput!("!tokens takes a statement"),
            ("!tokens", statement) => {
                Lexer::new(statement).for_each(|token| println!("{token:?}"));
            }

            (command, _) => return errinput!("unknown command {command}"),
        }
        Ok(())
    }

    /// Parses a SQL statement and displays the AST.
    fn execute_sql(&mut self, statement: &str) -> Result<()> {
        let ast = Parser::parse(statement)?;
        println!("{}", self.format.format(&ast)?);
        Ok(())
    }

    /// Runs the interactive shell.
    fn run(&mut self) -> Result<()> {
        // Load the history file, if any.
        if let Some(history_path) = &self.history_path {
            match self.editor.load_history(history_path) {
                Ok(()) => {}
                Err(ReadlineError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => return Err(error.into()),
            }
        }

        println!("trippySQL shell. Enter !help for instructions.");

        // Prompt for statements and execute them.
        loop {
            let input = match self.editor.readline("trippysql> ") {
                Ok(input) => input.trim().to_string(),
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(error) => return Err(error.into()),
            };
            self.editor.add_history_entry(&input)?;
            if let Err(error) = self.execute(&input) {
                println!("Error: {error}");
            };
        }

        // Save the history file.
        if let Some(history_path) = &self.history_path {
            self.editor.save_history(history_path)?;
        }
        Ok(())
    }
}

/// A Rustyline helper for multiline editing. After a new line is entered, it
/// determines whether the input makes up a complete statement, or whether a
/// quoted value is still open and it should wait for further input.
#[derive(Completer, Helper, Highlighter, Hinter)]
struct InputValidator;

impl Validator for InputValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        // Empty lines and ! commands are ready.
        if input.trim().is_empty() || input.starts_with('!') {
            return Ok(ValidationResult::Valid(None));
        }
        if has_open_quote(input) {
            return Ok(ValidationResult::Incomplete);
        }
        Ok(ValidationResult::Valid(None))
    }

    fn validate_while_typing(&self) -> bool {
        false // only check after completed lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trippysql::Error;

    #[test]
    fn format_from_str() {
        assert_eq!(Format::try_from("JSON"), Ok(Format::Json));
        assert_eq!(Format::try_from("sql"), Ok(Format::Sql));
        assert_eq!(Format::try_from("xml"), Err(Error::InvalidInput("unknown format xml".into())));
    }

    #[test]
    fn config_defaults_without_file() -> Result<()> {
        let cfg = Config::load("does/not/exist/trippysql.yaml")?;
        assert_eq!(cfg.log_level, "warn");
        assert_eq!(cfg.format, Format::Debug);
        assert!(cfg.history);
        Ok(())
    }

    #[test]
    fn config_file_overrides_defaults() -> Result<()> {
        let path = std::env::temp_dir().join(format!("trippysql-{}.yaml", std::process::id()));
        std::fs::write(&path, "format: json\nhistory: false\n")?;
        let cfg = Config::load(&path.to_string_lossy());
        std::fs::remove_file(&path)?;
        let cfg = cfg?;
        assert_eq!(cfg.log_level, "warn");
        assert_eq!(cfg.format, Format::Json);
        assert!(!cfg.history);
        Ok(())
    }

    #[test]
    fn format_sql() -> Result<()> {
        let ast = Parser::parse("delete from 'a' where b = '1'")?;
        assert_eq!(Format::Sql.format(&ast)?, "DELETE FROM 'a' WHERE b = '1'");
        assert!(Format::Json.format(&ast)?.contains("\"table_name\": \"a\""));
        Ok(())
    }
}

//! Command-line argument parser.
//!
//! Hand-rolled for zero-overhead startup. Options are parsed
//! left-to-right until a mode is chosen; short flags bundle.

use std::path::PathBuf;

// =============================================================================
// Execution Mode
// =============================================================================

/// What the driver should compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Compile a script file: `lyra script.ly`
    Script(PathBuf),
    /// Compile a command string: `lyra -c "print 1"`
    Command(String),
    /// Read source from stdin: `lyra -`
    Stdin,
    /// Print version and exit: `lyra -V` or `lyra --version`
    PrintVersion,
    /// Print help and exit: `lyra -h`, `lyra --help`, or no arguments.
    PrintHelp,
}

// =============================================================================
// Parsed Arguments
// =============================================================================

/// Complete set of parsed CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// What to compile.
    pub mode: ExecutionMode,

    /// `-d`: Dump the disassembly of all three regions after a
    /// successful compile.
    pub dump: bool,

    /// `-q`: Quiet mode (errors only).
    pub quiet: bool,

    /// `-v`: Verbosity, repeatable.
    pub verbose: u32,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::PrintHelp,
            dump: false,
            quiet: false,
            verbose: 0,
        }
    }
}

// =============================================================================
// Parse Error
// =============================================================================

/// Error during argument parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    /// Missing required argument value (e.g., `-c` without a command).
    MissingValue(&'static str),
    /// Unknown flag.
    UnknownFlag(String),
}

impl std::fmt::Display for ArgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgError::MissingValue(flag) => {
                write!(f, "argument expected for the {} option", flag)
            }
            ArgError::UnknownFlag(flag) => {
                write!(f, "unknown option: {}", flag)
            }
        }
    }
}

impl std::error::Error for ArgError {}

// =============================================================================
// Parser Entry Point
// =============================================================================

/// Parse command-line arguments.
///
/// The slice should not include the program name. Semantics:
///
/// 1. Options parse left-to-right until a non-option or `--`.
/// 2. A non-option argument is the script path and ends parsing.
/// 3. `-` means read from stdin.
/// 4. With no mode chosen, help is printed.
pub fn parse_args_vec(args: &[String]) -> Result<CliArgs, ArgError> {
    let mut result = CliArgs::default();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        // `--` terminates option parsing; the next argument is the
        // script path.
        if arg == "--" {
            i += 1;
            if i < args.len() {
                result.mode = ExecutionMode::Script(PathBuf::from(&args[i]));
            }
            return Ok(result);
        }

        // Non-option: script path.
        if !arg.starts_with('-') || arg == "-" {
            result.mode = if arg == "-" {
                ExecutionMode::Stdin
            } else {
                ExecutionMode::Script(PathBuf::from(arg))
            };
            return Ok(result);
        }

        // Option parsing: handle `-dq` bundled short options.
        let flag_chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;

        while j < flag_chars.len() {
            match flag_chars[j] {
                'V' => {
                    result.mode = ExecutionMode::PrintVersion;
                    return Ok(result);
                }
                'h' => {
                    result.mode = ExecutionMode::PrintHelp;
                    return Ok(result);
                }
                'c' => {
                    // `-c <cmd>`: bundled (`-cprint 1`) or separate.
                    let command = if j + 1 < flag_chars.len() {
                        flag_chars[j + 1..].iter().collect::<String>()
                    } else {
                        i += 1;
                        if i >= args.len() {
                            return Err(ArgError::MissingValue("-c"));
                        }
                        args[i].clone()
                    };
                    result.mode = ExecutionMode::Command(command);
                    return Ok(result);
                }
                'd' => result.dump = true,
                'q' => result.quiet = true,
                'v' => result.verbose = result.verbose.saturating_add(1),
                '-' => {
                    let long_opt: String = flag_chars[j..].iter().collect();
                    match long_opt.as_str() {
                        "-version" => {
                            result.mode = ExecutionMode::PrintVersion;
                            return Ok(result);
                        }
                        "-help" => {
                            result.mode = ExecutionMode::PrintHelp;
                            return Ok(result);
                        }
                        _ => {
                            return Err(ArgError::UnknownFlag(format!("-{}", long_opt)));
                        }
                    }
                }
                other => {
                    return Err(ArgError::UnknownFlag(format!("-{}", other)));
                }
            }
            j += 1;
        }

        i += 1;
    }

    Ok(result)
}

// =============================================================================
// Version / Help Text
// =============================================================================

/// Build the version string.
#[inline]
#[must_use]
pub fn version_string() -> String {
    format!("Lyra {}", lyra_core::VERSION)
}

/// Build the help text.
#[must_use]
pub fn help_text() -> String {
    format!(
        r#"usage: lyra [option] ... [-c cmd | file | -]
Options:
-c cmd : compile the program passed in as a string
-d     : dump the compiled bytecode regions after compiling
-h     : print this help message and exit (also --help)
-q     : only report errors
-v     : increase log verbosity (repeatable)
-V     : print the Lyra version number and exit (also --version)
file   : compile the program read from a script file
-      : compile the program read from stdin

Lyra {} — bytecode compiler"#,
        lyra_core::VERSION,
    )
}

// =============================================================================
// Tests
// =============================================================================

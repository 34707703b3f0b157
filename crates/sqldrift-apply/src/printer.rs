//! Serializing planned statements to a user-visible stream
//!
//! Multiple targets print concurrently; a single mutex around the
//! printer state keeps each statement's output atomic and the delimiter
//! bookkeeping consistent.

use std::collections::HashSet;
use std::io::Write;

use parking_lot::Mutex;

use crate::ddl::PlannedStatement;

/// Output style, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrinterMode {
    /// Full SQL with instance/schema/delimiter framing
    #[default]
    Standard,
    /// One line per instance that has any differences
    Brief,
}

struct PrinterState {
    out: Box<dyn Write + Send>,
    last_instance: Option<String>,
    last_schema: Option<String>,
    delimiter: String,
    briefed: HashSet<String>,
}

/// Thread-safe statement printer.
pub struct Printer {
    mode: PrinterMode,
    state: Mutex<PrinterState>,
}

impl Printer {
    pub fn new(mode: PrinterMode) -> Printer {
        Printer::with_output(mode, Box::new(std::io::stdout()))
    }

    pub fn with_output(mode: PrinterMode, out: Box<dyn Write + Send>) -> Printer {
        Printer {
            mode,
            state: Mutex::new(PrinterState {
                out,
                last_instance: None,
                last_schema: None,
                delimiter: ";".to_string(),
                briefed: HashSet::new(),
            }),
        }
    }

    /// Print one planned statement, emitting instance/schema/delimiter
    /// framing as needed. Output for one call is atomic.
    pub fn print_statement(&self, statement: &PlannedStatement) {
        let client_state = statement.client_state();
        let mut state = self.state.lock();

        if self.mode == PrinterMode::Brief {
            if state.briefed.insert(client_state.instance_id.clone()) {
                let _ = writeln!(state.out, "{}", client_state.instance_id);
            }
            return;
        }

        if state.last_instance.as_deref() != Some(client_state.instance_id.as_str()) {
            restore_delimiter(&mut state);
            let _ = writeln!(state.out, "-- instance: {}", client_state.instance_id);
            state.last_instance = Some(client_state.instance_id.clone());
            state.last_schema = None;
        }

        if !client_state.default_schema.is_empty()
            && state.last_schema.as_deref() != Some(client_state.default_schema.as_str())
        {
            restore_delimiter(&mut state);
            let _ = writeln!(
                state.out,
                "USE {};",
                sqldrift_core::quote_ident(&client_state.default_schema)
            );
            state.last_schema = Some(client_state.default_schema.clone());
        }

        match client_state.delimiter.as_str() {
            "" => {
                // Shell-outs print verbatim, with no delimiter handling.
                let _ = writeln!(state.out, "{}", statement.statement());
            }
            delimiter => {
                if state.delimiter != delimiter {
                    let _ = writeln!(state.out, "DELIMITER {delimiter}");
                    state.delimiter = delimiter.to_string();
                }
                let _ = writeln!(state.out, "{}{}", statement.statement(), delimiter);
            }
        }
    }

    /// Restore the standard delimiter if a target left a non-standard one
    /// active. Called when a target's statements are done.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        restore_delimiter(&mut state);
        let _ = state.out.flush();
    }
}

fn restore_delimiter(state: &mut PrinterState) {
    if state.delimiter != ";" {
        let _ = writeln!(state.out, "DELIMITER ;");
        state.delimiter = ";".to_string();
    }
}

#[cfg(test)]
mod tests;

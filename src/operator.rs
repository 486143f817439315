//! Interactive operator backed by the terminal.

use dialoguer::{Confirm, Input, Select};

use crate::emmc::{EmmcError, Operator, PartitionTable, Selection};

/// Asks on the terminal unless the answer was given up front on the command line.
#[derive(Debug, Default)]
pub struct TerminalOperator {
    preset: Option<Selection>,
    assume_yes: bool,
}

impl TerminalOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.preset = Some(selection);
        self
    }

    /// Answer every confirmation with yes.
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }
}

fn prompt_error(err: dialoguer::Error) -> EmmcError {
    EmmcError::Prompt(err.to_string())
}

impl Operator for TerminalOperator {
    fn confirm(&mut self, message: &str) -> Result<bool, EmmcError> {
        if self.assume_yes {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(prompt_error)
    }

    fn select(&mut self, table: &PartitionTable) -> Result<Selection, EmmcError> {
        if let Some(selection) = &self.preset {
            return Ok(selection.clone());
        }

        let items = [
            "Dump system partition (system.img)",
            "Dump userdata partition (userdata.img)",
            "Dump a custom partition",
        ];
        let choice = Select::new()
            .with_prompt("What would you like to do?")
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(prompt_error)?;

        match choice {
            Some(0) => Ok(Selection::System),
            Some(1) => Ok(Selection::Userdata),
            Some(_) => {
                let known: Vec<&str> = table.names().collect();
                let name: String = Input::new()
                    .with_prompt(format!("Partition name ({})", known.join(", ")))
                    .interact_text()
                    .map_err(prompt_error)?;
                Ok(Selection::Custom(name.trim().to_string()))
            }
            None => Err(EmmcError::Prompt("selection cancelled".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_answers_skip_the_terminal() {
        let table = PartitionTable::new(Vec::new(), 0);
        let mut operator = TerminalOperator::new()
            .with_selection(Selection::Custom("boot_a".to_string()))
            .assume_yes(true);

        assert!(operator.confirm("Proceed?").unwrap());
        assert_eq!(
            operator.select(&table).unwrap(),
            Selection::Custom("boot_a".to_string())
        );
    }
}

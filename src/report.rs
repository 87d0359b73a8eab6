/*!
Error chain printer for the command line front end.
*/

use std::{error::Error as StdError, fmt};

/// Wraps any error and prints it together with every `source()` below it.
pub struct Report(Box<dyn StdError>);

impl Report {
    pub fn new(error: impl Into<Box<dyn StdError>>) -> Self {
        Report(error.into())
    }

    fn causes(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        std::iter::successors(self.0.source(), |&e| e.source())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        for cause in self.causes() {
            write!(f, ": {}", cause)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.0)?;

        let mut causes = self.causes().enumerate().peekable();
        if causes.peek().is_some() {
            writeln!(f, "\nCaused by:")?;
            for (i, e) in causes {
                writeln!(f, "  {}: {}", i, e)?;
            }
        }

        Ok(())
    }
}

impl<E: Into<Box<dyn StdError>>> From<E> for Report {
    fn from(e: E) -> Self {
        Report::new(e)
    }
}

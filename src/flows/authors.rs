use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use super::{begin, commit, guarded, FlowResult, Outcome, Prompter};
use crate::db::{delete_author_id, get_author_id, get_authors_number_of_series, update_author_name};
use crate::error::FlowError;

#[derive(Debug, Clone, Default)]
pub struct UpdateAuthorRequest {
    pub old_name: String,
    pub new_name: String,
}

impl UpdateAuthorRequest {
    pub fn prompt(io: &mut dyn Prompter) -> Result<Self> {
        Ok(Self {
            old_name: io.ask("Old name: ")?,
            new_name: io.ask("New name: ")?,
        })
    }
}

/// Rename an existing author.
pub fn update_author(conn: &mut Connection, request: &UpdateAuthorRequest) -> FlowResult {
    let UpdateAuthorRequest { old_name, new_name } = request;

    if old_name.is_empty() && new_name.is_empty() {
        return Ok(Outcome::Cancelled("Inputs were empty, cancelling.".into()));
    }
    if old_name.is_empty() {
        return Err(FlowError::validation("Provided old name was empty, try again."));
    }
    if new_name.is_empty() {
        return Err(FlowError::validation("Provided new name was empty, try again."));
    }

    let tx = begin(conn)?;
    let Some(author_id) = get_author_id(&tx, old_name)? else {
        return Err(FlowError::validation(format!(
            "The name \"{old_name}\" does not exist in the database, try again."
        )));
    };
    if get_author_id(&tx, new_name)?.is_some_and(|taken| taken != author_id) {
        return Err(FlowError::validation(format!(
            "Author \"{new_name}\" already exists in the database, try again."
        )));
    }
    update_author_name(&tx, author_id, new_name)?;
    commit(tx)?;

    info!(author_id, %old_name, %new_name, "renamed author");
    Ok(Outcome::Applied(format!("Name has been changed to '{new_name}'.")))
}

pub fn update_author_flow(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    guarded(conn, io, &["authors"], UpdateAuthorRequest::prompt, update_author)
}

#[derive(Debug, Clone, Default)]
pub struct DeleteAuthorRequest {
    pub name: String,
}

impl DeleteAuthorRequest {
    pub fn prompt(io: &mut dyn Prompter) -> Result<Self> {
        Ok(Self {
            name: io.ask("Author's name: ")?,
        })
    }
}

/// Remove an author that no series points at.
pub fn delete_author(conn: &mut Connection, request: &DeleteAuthorRequest) -> FlowResult {
    let name = &request.name;
    if name.is_empty() {
        return Ok(Outcome::Cancelled("Input was empty, cancelling.".into()));
    }

    let tx = begin(conn)?;
    let Some(author_id) = get_author_id(&tx, name)? else {
        return Err(FlowError::validation(format!(
            "Author \"{name}\" does NOT exist in the database. Try again."
        )));
    };

    let series = get_authors_number_of_series(&tx, Some(author_id))?;
    if series > 0 {
        return Err(FlowError::precondition(format!(
            "Could not remove author \"{name}\". There are still {series} series connected to this author, unlink them from the author first."
        )));
    }

    delete_author_id(&tx, author_id)?;
    commit(tx)?;

    if get_author_id(conn, name)?.is_some() {
        return Err(FlowError::anomaly(format!("Author \"{name}\" was NOT removed.")));
    }
    info!(author_id, %name, "removed author");
    Ok(Outcome::Applied(format!("Author \"{name}\" was removed.")))
}

pub fn delete_author_flow(conn: &mut Connection, io: &mut dyn Prompter) -> Result<()> {
    guarded(conn, io, &["authors", "series"], DeleteAuthorRequest::prompt, delete_author)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_tables, get_author_name, insert_author, insert_series, open_in_memory};
    use crate::flows::ScriptedPrompter;

    fn library() -> Connection {
        let conn = open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        insert_author(&conn, "Andy Weir").unwrap();
        insert_series(&conn, 1, "The Martian").unwrap();
        insert_author(&conn, "Kit Frick").unwrap();
        conn
    }

    fn rename(conn: &mut Connection, old: &str, new: &str) -> FlowResult {
        update_author(
            conn,
            &UpdateAuthorRequest {
                old_name: old.into(),
                new_name: new.into(),
            },
        )
    }

    #[test]
    fn rename_existing_author() {
        let mut conn = library();
        let outcome = rename(&mut conn, "Andy Weir", "Weir Andy").unwrap();
        assert_eq!(
            outcome,
            Outcome::Applied("Name has been changed to 'Weir Andy'.".into())
        );
        assert_eq!(
            get_author_name(&conn, Some(1)).unwrap().as_deref(),
            Some("Weir Andy")
        );
    }

    #[test]
    fn rename_guards_in_order() {
        let mut conn = library();
        assert_eq!(
            rename(&mut conn, "", "").unwrap(),
            Outcome::Cancelled("Inputs were empty, cancelling.".into())
        );
        let err = rename(&mut conn, "", "Weir Andy").unwrap_err();
        assert_eq!(err.to_string(), "Provided old name was empty, try again.");
        let err = rename(&mut conn, "Andy Weir", "").unwrap_err();
        assert_eq!(err.to_string(), "Provided new name was empty, try again.");
        let err = rename(&mut conn, "Weir Andy", "Weir Andy").unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "The name \"Weir Andy\" does not exist in the database, try again."
        );
    }

    #[test]
    fn rename_onto_existing_author_is_retryable() {
        let mut conn = library();
        let err = rename(&mut conn, "Andy Weir", "Kit Frick").unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Author \"Kit Frick\" already exists in the database, try again."
        );
        assert_eq!(get_author_name(&conn, Some(1)).unwrap().as_deref(), Some("Andy Weir"));

        let mut io = ScriptedPrompter::new(["Andy Weir", "Kit Frick", "Andy Weir", "A. Weir"]);
        update_author_flow(&mut conn, &mut io).unwrap();
        assert_eq!(io.said.len(), 2);
        assert_eq!(io.last_said(), Some("Name has been changed to 'A. Weir'."));
        assert_eq!(io.remaining(), 0);
    }

    #[test]
    fn delete_outcomes() {
        let mut conn = library();
        let delete = |conn: &mut Connection, name: &str| {
            delete_author(conn, &DeleteAuthorRequest { name: name.into() })
        };

        assert_eq!(
            delete(&mut conn, "").unwrap(),
            Outcome::Cancelled("Input was empty, cancelling.".into())
        );

        let err = delete(&mut conn, "Weir Andy").unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("Author \"Weir Andy\" does NOT exist"));

        let err = delete(&mut conn, "Andy Weir").unwrap_err();
        assert!(!err.is_retryable());
        assert!(err
            .to_string()
            .ends_with("There are still 1 series connected to this author, unlink them from the author first."));
        assert!(get_author_id(&conn, "Andy Weir").unwrap().is_some());
        assert_eq!(get_authors_number_of_series(&conn, Some(1)).unwrap(), 1);

        assert_eq!(
            delete(&mut conn, "Kit Frick").unwrap(),
            Outcome::Applied("Author \"Kit Frick\" was removed.".into())
        );
        assert_eq!(get_author_id(&conn, "Kit Frick").unwrap(), None);
    }

    #[test]
    fn interactive_rename_reprompts_until_valid() {
        let mut conn = library();
        let mut io = ScriptedPrompter::new(["", "Weir Andy", "Andy Weir", "Weir Andy"]);
        update_author_flow(&mut conn, &mut io).unwrap();
        assert_eq!(
            io.said,
            vec![
                "Provided old name was empty, try again.",
                "Name has been changed to 'Weir Andy'."
            ]
        );
    }

    #[test]
    fn interactive_delete_with_series_is_single_shot() {
        let mut conn = library();
        let mut io = ScriptedPrompter::new(["Andy Weir", "Kit Frick"]);
        delete_author_flow(&mut conn, &mut io).unwrap();
        assert_eq!(io.said.len(), 1);
        assert!(io.said[0].starts_with("Could not remove author \"Andy Weir\"."));
        assert_eq!(io.remaining(), 1);
    }

    #[test]
    fn interactive_flows_report_broken_schema() {
        let mut conn = open_in_memory().unwrap();
        let mut io = ScriptedPrompter::default();
        update_author_flow(&mut conn, &mut io).unwrap();
        delete_author_flow(&mut conn, &mut io).unwrap();
        assert!(io.said[0].starts_with("Table corrupted."));
        assert!(io.said[1].starts_with("At least one table is corrupted."));
    }
}

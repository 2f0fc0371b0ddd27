//! SQL step library: connection management, statements, queries and
//! result-set comparison.

use crate::{
    context::ScenarioContext,
    data_table::DataTable,
    error::{AssertionError, StepError, TransportError},
    step::{Context, Registry},
    transport::SqlTransport,
};

/// All SQL steps, ready to merge into an executor.
#[must_use]
pub fn registry() -> Registry<ScenarioContext> {
    Registry::new()
        .given(r"^I connect to the database '(.+?)'$", connect)
        .given(r"^I close database connection$", disconnect)
        .when(r"^I execute query '(.+?)'$", execute_query)
        .when(r"^I query the database with '(.+?)'$", query)
        .then(
            r"^I check that I am( not)? connected to the database$",
            check_connected,
        )
        .then(
            r"^the database result matches the following table:$",
            check_result,
        )
        .then(r"^table '(.+?)' (exists|doesn't exist)$", check_table_exists)
}

fn connect(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let url = w.vars.expand(ctx.param(1)?);
    sql(w)?.connect(&url).map_err(Into::into)
}

fn disconnect(
    w: &mut ScenarioContext,
    _: &mut Context,
) -> Result<(), StepError> {
    sql(w)?.disconnect().map_err(Into::into)
}

fn check_connected(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let expect_disconnected = ctx.opt(1).is_some();
    let connected = sql(w)?.connected();
    match (connected, expect_disconnected) {
        (true, false) | (false, true) => Ok(()),
        (false, false) => Err(AssertionError::new(
            "not connected to the database",
        )
        .into()),
        (true, true) => Err(AssertionError::new(
            "still connected to the database",
        )
        .into()),
    }
}

fn execute_query(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let statement = w.vars.expand(ctx.param(1)?);
    let affected = sql(w)?.execute_update(&statement)?;
    w.vars.set("sql.affected", affected.to_string());
    Ok(())
}

fn query(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let statement = w.vars.expand(ctx.param(1)?);
    let rows = sql(w)?.query(&statement)?;
    w.sql_result = Some(rows);
    Ok(())
}

fn check_result(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let expected = DataTable::from(ctx.require_table()?);
    let result = w.sql_result.as_ref().ok_or_else(|| {
        StepError::Assertion(AssertionError::new(
            "no query has been run yet",
        ))
    })?;

    let actual = result.as_table();
    if actual.len() != expected.len() {
        return Err(AssertionError::mismatch(
            "database result row count (header included)",
            expected.len().to_string(),
            actual.len().to_string(),
        )
        .into());
    }
    for (i, (got, want)) in
        actual.iter().zip(expected.raw().iter()).enumerate()
    {
        if got != want {
            return Err(AssertionError::mismatch(
                format!("database result row {}", i + 1),
                format!("| {} |", want.join(" | ")),
                format!("| {} |", got.join(" | ")),
            )
            .into());
        }
    }
    Ok(())
}

fn check_table_exists(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let name = w.vars.expand(ctx.param(1)?);
    let expect_exists = ctx.param(2)? == "exists";
    let exists = sql(w)?.table_exists(&name)?;
    match (exists, expect_exists) {
        (true, true) | (false, false) => Ok(()),
        (false, true) => Err(AssertionError::new(format!(
            "table `{name}` does not exist",
        ))
        .into()),
        (true, false) => Err(AssertionError::new(format!(
            "table `{name}` exists, but should not",
        ))
        .into()),
    }
}

fn sql(
    w: &mut ScenarioContext,
) -> Result<&mut Box<dyn SqlTransport>, StepError> {
    w.sql.as_mut().ok_or_else(|| {
        StepError::Transport(TransportError::sql(
            "no SQL transport installed",
        ))
    })
}

#[cfg(test)]
mod tests {
    use gherkin::{Feature, GherkinEnv};

    use crate::{
        transport::{mock, SqlRows},
        world::World as _,
    };

    use super::*;

    fn world() -> ScenarioContext {
        let mut w = ScenarioContext::new().unwrap();
        let mut sql = mock::Sql::default();
        let _ = sql.tables.insert(
            "SELECT id, name FROM users".to_owned(),
            SqlRows {
                columns: vec!["id".into(), "name".into()],
                rows: vec![
                    vec!["1".into(), "ada".into()],
                    vec!["2".into(), "grace".into()],
                ],
            },
        );
        let _ = sql.tables.insert("users".to_owned(), SqlRows::default());
        w.sql = Some(Box::new(sql));
        w
    }

    fn exec(w: &mut ScenarioContext, src: &str) -> Result<(), StepError> {
        let feature = Feature::parse(src, GherkinEnv::default()).unwrap();
        let reg = registry();
        for step in &feature.scenarios[0].steps {
            let mut m = reg.resolve(step).unwrap();
            (m.func)(w, &mut m.context)?;
        }
        Ok(())
    }

    #[test]
    fn connect_query_and_compare() {
        let mut w = world();
        exec(
            &mut w,
            "Feature: f\n\
             \x20 Scenario: s\n\
             \x20   Given I connect to the database 'db://local'\n\
             \x20   Then I check that I am connected to the database\n\
             \x20   When I query the database with 'SELECT id, name FROM users'\n\
             \x20   Then the database result matches the following table:\n\
             \x20     | id | name  |\n\
             \x20     | 1  | ada   |\n\
             \x20     | 2  | grace |\n",
        )
        .unwrap();
    }

    #[test]
    fn mismatching_result_cites_the_row() {
        let mut w = world();
        let err = exec(
            &mut w,
            "Feature: f\n\
             \x20 Scenario: s\n\
             \x20   Given I connect to the database 'db://local'\n\
             \x20   When I query the database with 'SELECT id, name FROM users'\n\
             \x20   Then the database result matches the following table:\n\
             \x20     | id | name |\n\
             \x20     | 1  | ada  |\n\
             \x20     | 2  | enid |\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("row 3"), "{err}");
    }

    #[test]
    fn table_existence_checks_both_polarities() {
        let mut w = world();
        exec(
            &mut w,
            "Feature: f\n\
             \x20 Scenario: s\n\
             \x20   Given I connect to the database 'db://local'\n\
             \x20   Then table 'users' exists\n\
             \x20   And table 'orders' doesn't exist\n",
        )
        .unwrap();
    }

    #[test]
    fn disconnect_flips_the_connection_check() {
        let mut w = world();
        exec(
            &mut w,
            "Feature: f\n\
             \x20 Scenario: s\n\
             \x20   Given I connect to the database 'db://local'\n\
             \x20   Given I close database connection\n\
             \x20   Then I check that I am not connected to the database\n",
        )
        .unwrap();
    }

    #[test]
    fn update_saves_the_affected_count() {
        let mut w = world();
        exec(
            &mut w,
            "Feature: f\n\
             \x20 Scenario: s\n\
             \x20   Given I connect to the database 'db://local'\n\
             \x20   When I execute query 'DELETE FROM users'\n",
        )
        .unwrap();
        assert_eq!(w.vars.get("sql.affected").as_deref(), Some("1"));
    }

    #[test]
    fn querying_without_a_transport_is_a_transport_error() {
        let mut w = ScenarioContext::new().unwrap();
        w.sql = None;
        let err = exec(
            &mut w,
            "Feature: f\n\
             \x20 Scenario: s\n\
             \x20   Given I connect to the database 'db://local'\n",
        )
        .unwrap_err();
        assert!(matches!(err, StepError::Transport(_)));
    }
}

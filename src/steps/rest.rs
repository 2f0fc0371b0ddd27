//! REST step library: target setup, request sending, response assertions,
//! polling and variable capture.

use std::time::Duration;

use crate::{
    condition,
    context::{Protocol, ScenarioContext},
    data_table::DataTable,
    error::{AssertionError, StepError, TransportError},
    jsonpath, poll,
    step::{Context, Registry},
    transport::{Method, Response},
};

/// All REST steps, ready to merge into an executor.
#[must_use]
pub fn registry() -> Registry<ScenarioContext> {
    Registry::new()
        .given(
            r"^I( securely)? send requests to '([^:']+?)(?::(\d+))?'$",
            setup_target,
        )
        .given(r"^I set headers:$", set_headers)
        .given(r"^I set cookies:$", set_cookies)
        .given(r"^I set url query parameters:$", set_query_params)
        .given(r"^I clear headers from previous request$", clear_headers)
        .given(r"^I clear cookies from previous request$", clear_cookies)
        .given(
            r"^I clear the url query parameters from previous request$",
            clear_query_params,
        )
        .when(
            r"^I send a '(.+?)' request to '(.+?)'( with user and password '(.+?):(.+?)')?$",
            send_request,
        )
        .when(
            r"^in less than '(\d+)' seconds, checking each '(\d+)' seconds, I send a '(.+?)' request to '(.+?)' so that the response( does not)? contains? '(.+?)'$",
            send_request_until,
        )
        .when(
            r"^I save the response header '(.+?)' in variable '(.+?)'$",
            save_header,
        )
        .when(
            r"^I save the response cookie '(.+?)' in variable '(.+?)'$",
            save_cookie,
        )
        .when(r"^I save element '(.+?)' in variable '(.+?)'$", save_element)
        .then(
            r"^the service response status must be '(\d+)'( and its response length must be '(\d+)')?( and its response must contain the text '(.+?)')?$",
            check_status,
        )
        .then(
            r"^the service response must contain the text '(.+?)'$",
            check_body_contains,
        )
        .then(
            r"^the service response headers match the following cases:$",
            check_headers,
        )
        .then(
            r"^the service response cookies match the following cases:$",
            check_cookies,
        )
        .then(
            r"^the service response body matches the following cases:$",
            check_body_cases,
        )
}

fn setup_target(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let protocol = if ctx.opt(1).is_some() {
        Protocol::Https
    } else {
        Protocol::Http
    };
    let host = w.vars.expand(ctx.param(2)?);
    let port = ctx.parse_opt::<u16>(3)?;
    w.request.setup(protocol, &host, port);
    Ok(())
}

fn set_headers(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let pairs = DataTable::from(ctx.require_table()?).key_values()?;
    w.request.set_headers(expand_values(w, pairs));
    Ok(())
}

fn set_cookies(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let pairs = DataTable::from(ctx.require_table()?).key_values()?;
    w.request.set_cookies(expand_values(w, pairs));
    Ok(())
}

fn set_query_params(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let pairs = DataTable::from(ctx.require_table()?).key_values()?;
    w.request.set_query_params(expand_values(w, pairs));
    Ok(())
}

fn clear_headers(
    w: &mut ScenarioContext,
    _: &mut Context,
) -> Result<(), StepError> {
    w.request.clear_headers();
    Ok(())
}

fn clear_cookies(
    w: &mut ScenarioContext,
    _: &mut Context,
) -> Result<(), StepError> {
    w.request.clear_cookies();
    Ok(())
}

fn clear_query_params(
    w: &mut ScenarioContext,
    _: &mut Context,
) -> Result<(), StepError> {
    w.request.clear_query_params();
    Ok(())
}

fn send_request(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let method = parse_method(ctx, 1)?;
    let endpoint = w.vars.expand(ctx.param(2)?);
    if let (Some(user), Some(password)) = (ctx.opt(4), ctx.opt(5)) {
        w.request.set_auth(user, password);
    }
    if let Some(body) = ctx.docstring() {
        let body = w.vars.expand(body.trim());
        w.request.set_body(body);
    }
    w.response = Some(dispatch(w, method, &endpoint)?);
    Ok(())
}

fn send_request_until(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let timeout = Duration::from_secs(ctx.parse(1)?);
    let interval = Duration::from_secs(ctx.parse(2)?);
    let method = parse_method(ctx, 3)?;
    let endpoint = w.vars.expand(ctx.param(4)?);
    let negated = ctx.opt(5).is_some();
    let expected = w.vars.expand(ctx.param(6)?);

    poll::poll(timeout, interval, || {
        let response = dispatch(w, method, &endpoint)?;
        let contains = response.body.contains(&expected);
        w.response = Some(response);
        match (contains, negated) {
            (true, false) | (false, true) => Ok(()),
            (false, false) => Err(AssertionError::new(format!(
                "response does not contain `{expected}`",
            ))
            .into()),
            (true, true) => Err(AssertionError::new(format!(
                "response still contains `{expected}`",
            ))
            .into()),
        }
    })?;
    Ok(())
}

fn save_header(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let name = ctx.param(1)?.to_owned();
    let var = ctx.param(2)?.to_owned();
    let value = response(w)?
        .header(&name)
        .ok_or_else(|| {
            StepError::Assertion(AssertionError::new(format!(
                "response has no `{name}` header",
            )))
        })?
        .to_owned();
    w.vars.set(var, value);
    Ok(())
}

fn save_cookie(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let name = ctx.param(1)?.to_owned();
    let var = ctx.param(2)?.to_owned();
    let value = response(w)?
        .cookies
        .get(&name)
        .ok_or_else(|| {
            StepError::Assertion(AssertionError::new(format!(
                "response has no `{name}` cookie",
            )))
        })?
        .clone();
    w.vars.set(var, value);
    Ok(())
}

fn save_element(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let path = ctx.param(1)?.to_owned();
    let var = ctx.param(2)?.to_owned();
    let body = parse_body(response(w)?)?;
    let value = jsonpath::lookup_str(&body, &path)?.ok_or_else(|| {
        StepError::Assertion(AssertionError::new(format!(
            "`{path}` does not exist in the response body",
        )))
    })?;
    w.vars.set(var, value);
    Ok(())
}

fn check_status(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let expected: u16 = ctx.parse(1)?;
    let length = ctx.parse_opt::<usize>(3)?;
    let text = ctx.opt(5).map(|t| w.vars.expand(t));

    let response = response(w)?;
    if response.status != expected {
        return Err(AssertionError::mismatch(
            "response status",
            expected.to_string(),
            response.status.to_string(),
        )
        .into());
    }
    if let Some(length) = length {
        let got = response.body.chars().count();
        if got != length {
            return Err(AssertionError::mismatch(
                "response length",
                length.to_string(),
                got.to_string(),
            )
            .into());
        }
    }
    if let Some(text) = text {
        if !response.body.contains(&text) {
            return Err(AssertionError::new(format!(
                "response does not contain `{text}`",
            ))
            .into());
        }
    }
    Ok(())
}

fn check_body_contains(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let text = w.vars.expand(ctx.param(1)?);
    let response = response(w)?;
    if response.body.contains(&text) {
        Ok(())
    } else {
        Err(AssertionError::new(format!(
            "response does not contain `{text}`",
        ))
        .into())
    }
}

fn check_headers(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let rows = condition_rows(w, ctx)?;
    let response = response(w)?;
    condition::check_all(&rows, |name| {
        response.header(name).map(ToOwned::to_owned)
    })
}

fn check_cookies(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let rows = condition_rows(w, ctx)?;
    let response = response(w)?;
    condition::check_all(&rows, |name| response.cookies.get(name).cloned())
}

fn check_body_cases(
    w: &mut ScenarioContext,
    ctx: &mut Context,
) -> Result<(), StepError> {
    let rows = condition_rows(w, ctx)?;
    let body = parse_body(response(w)?)?;
    condition::check_all(&rows, |path| {
        jsonpath::lookup_str(&body, path).ok().flatten()
    })
}

/// Parses the condition table of a step, expanding `${var}` placeholders in
/// its expectation cells.
fn condition_rows(
    w: &ScenarioContext,
    ctx: &Context,
) -> Result<Vec<condition::ConditionRow>, StepError> {
    let table = DataTable::from(ctx.require_table()?);
    let mut rows = condition::parse_rows(&table)?;
    for row in &mut rows {
        row.expected = w.vars.expand(&row.expected);
    }
    Ok(rows)
}

fn expand_values(
    w: &ScenarioContext,
    pairs: linked_hash_map::LinkedHashMap<String, String>,
) -> linked_hash_map::LinkedHashMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k, w.vars.expand(&v)))
        .collect()
}

fn parse_method(ctx: &Context, group: usize) -> Result<Method, StepError> {
    ctx.parse::<Method>(group).map_err(Into::into)
}

/// Sends one request through the installed HTTP transport, consuming the
/// pending body.
fn dispatch(
    w: &mut ScenarioContext,
    method: Method,
    endpoint: &str,
) -> Result<Response, StepError> {
    let spec = w.request.clone();
    let http = w.http.as_mut().ok_or_else(|| {
        StepError::Transport(TransportError::http(
            "no HTTP transport installed",
        ))
    })?;
    let result = http.send(&spec, method, endpoint);
    let _ = w.request.take_body();
    result.map_err(Into::into)
}

fn response(w: &ScenarioContext) -> Result<&Response, StepError> {
    w.response.as_ref().ok_or_else(|| {
        StepError::Assertion(AssertionError::new(
            "no request has been sent yet",
        ))
    })
}

fn parse_body(response: &Response) -> Result<serde_json::Value, StepError> {
    serde_json::from_str(&response.body).map_err(|e| {
        StepError::Assertion(AssertionError::new(format!(
            "response body is not valid JSON: {e}",
        )))
    })
}

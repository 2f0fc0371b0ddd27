use std::{
    fs,
    sync::{Arc, Mutex},
};

use cardamom::{
    error::TransportError,
    steps,
    transport::{mock, Response},
    Cardamom, HttpTransport, Method, RequestSpec, ScenarioContext,
    Transports,
};
use cardamom::writer::Summarize;
use linked_hash_map::LinkedHashMap;

/// Hands every world the same scripted transport.
struct Shared(Arc<Mutex<mock::Http>>);

impl HttpTransport for Shared {
    fn send(
        &mut self,
        spec: &RequestSpec,
        method: Method,
        endpoint: &str,
    ) -> Result<Response, TransportError> {
        self.0.lock().unwrap().send(spec, method, endpoint)
    }
}

struct Sink;

impl cardamom::Writer for Sink {
    fn handle(&mut self, _: &cardamom::event::Run) {}
}

#[test]
fn rest_library_runs_a_feature_end_to_end() {
    let script = Arc::new(Mutex::new(mock::Http::default()));
    {
        let mut guard = script.lock().unwrap();
        let mut headers = LinkedHashMap::new();
        let _ = headers.insert(
            "Location".to_owned(),
            "/users/42".to_owned(),
        );
        let _ = guard
            .reply(Response {
                status: 201,
                headers,
                cookies: LinkedHashMap::new(),
                body: r#"{"id":42,"name":"ada"}"#.to_owned(),
            })
            .reply(Response {
                status: 200,
                headers: LinkedHashMap::new(),
                cookies: LinkedHashMap::new(),
                body: r#"{"id":42,"name":"ada"}"#.to_owned(),
            });
    }
    {
        let script = Arc::clone(&script);
        Transports::new()
            .http(move || Box::new(Shared(Arc::clone(&script))))
            .install();
    }

    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("users.feature"),
        "Feature: Users API\n\
         \x20 Scenario: create and fetch\n\
         \x20   Given I send requests to 'api.internal:8080'\n\
         \x20   And I set headers:\n\
         \x20     | Accept | application/json |\n\
         \x20   When I send a 'POST' request to '/users'\n\
         \x20     \"\"\"\n\
         \x20     {\"name\": \"ada\"}\n\
         \x20     \"\"\"\n\
         \x20   Then the service response status must be '201'\n\
         \x20   When I save the response header 'Location' in variable 'loc'\n\
         \x20   And I send a 'GET' request to '${loc}'\n\
         \x20   Then the service response status must be '200' and its \
         response must contain the text 'ada'\n\
         \x20   And the service response body matches the following cases:\n\
         \x20     | $.id    | equal  | 42  |\n\
         \x20     | $.name  | equal  | ada |\n\
         \x20     | $.email | does not exist |  |\n",
    )
    .unwrap();

    let out = tempfile::tempdir().unwrap();
    let mut writer = Summarize::new(Sink);
    Cardamom::<ScenarioContext>::new()
        .steps(steps::rest::registry())
        .output_dir(out.path())
        .run_with_writer(dir.path().to_path_buf(), &mut writer)
        .unwrap();

    assert_eq!(writer.scenarios.passed, 1, "{}", writer.to_string());
    assert!(!writer.execution_has_failed());

    let guard = script.lock().unwrap();
    assert_eq!(guard.sent.len(), 2);
    assert_eq!(guard.sent[0].method, Method::Post);
    assert_eq!(
        guard.sent[0].body.as_deref(),
        Some(r#"{"name": "ada"}"#),
    );
    assert_eq!(guard.sent[1].endpoint, "/users/42");
    assert_eq!(
        guard.sent[1].headers.get("Accept").map(String::as_str),
        Some("application/json"),
    );
}

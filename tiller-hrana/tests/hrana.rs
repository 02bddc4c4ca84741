#[cfg(test)]
mod tests {
    use indoc::indoc;
    use std::env;
    use tiller_core::{RemoteError, Value, WireValue};
    use tiller_hrana::{HranaConfig, HranaTransport, PipelineRequest, parse_response};
    use tiller_tests::{execute_tests, init_logs};

    #[test]
    fn config() {
        let config = HranaConfig::parse("libsql://db-org.turso.io?authToken=abc.def").unwrap();
        assert_eq!(config.url.as_str(), "https://db-org.turso.io/");
        assert_eq!(config.token.as_deref(), Some("abc.def"));
        assert_eq!(config.pipeline_url(), "https://db-org.turso.io/v2/pipeline");
        assert_eq!(config.authorization().as_deref(), Some("Bearer abc.def"));

        let config = HranaConfig::parse("http://127.0.0.1:8080/base/?mode=x").unwrap();
        assert_eq!(config.token, None);
        assert_eq!(config.authorization(), None);
        assert_eq!(
            config.pipeline_url(),
            "http://127.0.0.1:8080/base/v2/pipeline?mode=x"
        );

        let config = config.with_token("Basic dXNlcjpwYXNz");
        assert_eq!(
            config.authorization().as_deref(),
            Some("Basic dXNlcjpwYXNz")
        );

        assert!(HranaConfig::parse("postgres://localhost/db").is_err());
        assert!(HranaConfig::parse("not a url").is_err());
    }

    #[test]
    fn request() {
        let body = serde_json::to_string(&PipelineRequest::execute("SELECT 1")).unwrap();
        assert_eq!(
            body,
            r#"{"requests":[{"type":"execute","stmt":{"sql":"SELECT 1"}},{"type":"close"}]}"#
        );
    }

    #[test]
    fn rows() {
        let envelope = parse_response(indoc! {r#"
            {
                "baton": null,
                "base_url": null,
                "results": [
                    {
                        "type": "ok",
                        "response": {
                            "type": "execute",
                            "result": {
                                "cols": [
                                    {"name": "id", "decltype": "INTEGER"},
                                    {"name": "firstName", "decltype": "TEXT"},
                                    {"name": "score", "decltype": "REAL"},
                                    {"name": "avatar", "decltype": "BLOB"},
                                    {"name": "email", "decltype": "TEXT"}
                                ],
                                "rows": [
                                    [
                                        {"type": "integer", "value": "1"},
                                        {"type": "text", "value": "John"},
                                        {"type": "float", "value": 9.5},
                                        {"type": "blob", "base64": "AAEC"},
                                        {"type": "null"}
                                    ]
                                ],
                                "affected_row_count": 0,
                                "last_insert_rowid": null,
                                "replication_index": "12"
                            }
                        }
                    },
                    {"type": "ok", "response": {"type": "close"}}
                ]
            }
        "#})
        .expect("Could not parse");
        assert_eq!(envelope.error, None);
        assert_eq!(
            envelope.columns,
            ["id", "firstName", "score", "avatar", "email"]
        );
        assert_eq!(envelope.rows.len(), 1);
        let row = &envelope.rows[0];
        assert_eq!(row[0], WireValue::integer(1));
        assert_eq!(row[1].decode("firstName").unwrap(), Value::Text("John".into()));
        assert_eq!(row[2].decode("score").unwrap(), Value::Float(9.5));
        assert_eq!(row[3].decode("avatar").unwrap(), Value::Text("AAEC".into()));
        assert_eq!(row[4].decode("email").unwrap(), Value::Null);
        assert_eq!(envelope.affected_row_count, Some(0));
        assert_eq!(envelope.last_insert_id, None);
    }

    #[test]
    fn affected() {
        let envelope = parse_response(
            r#"{"results":[{"type":"ok","response":{"type":"execute","result":{"cols":[],"rows":[],"affected_row_count":1,"last_insert_rowid":"42"}}},{"type":"ok","response":{"type":"close"}}]}"#,
        )
        .expect("Could not parse");
        assert!(envelope.columns.is_empty());
        assert_eq!(envelope.affected_row_count, Some(1));
        assert_eq!(envelope.last_insert_id, Some(42));
    }

    #[test]
    fn errors() {
        let envelope = parse_response(
            r#"{"results":[{"type":"error","error":{"message":"no such table: ghosts","code":"SQLITE_ERROR"}},{"type":"error","error":{"message":"stream closed"}}]}"#,
        )
        .expect("Could not parse");
        assert_eq!(
            envelope.error,
            Some(RemoteError {
                code: "SQLITE_ERROR".into(),
                message: "no such table: ghosts".into(),
            })
        );
        assert!(envelope.rows.is_empty());

        assert!(parse_response(r#"{"results":[]}"#).is_err());
        assert!(parse_response("<html>Bad gateway</html>").is_err());
        assert!(
            parse_response(
                r#"{"results":[{"type":"ok","response":{"type":"execute","result":{"last_insert_rowid":"x"}}}]}"#
            )
            .is_err()
        );
    }

    #[tokio::test]
    async fn live() {
        init_logs();
        if env::var("TILLER_URL").is_err() {
            log::warn!("TILLER_URL is not set, skipping the live suite");
            return;
        }
        let transport = HranaTransport::from_env().expect("Could not create the transport");
        execute_tests(transport).await;
    }
}

#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub struct Sidecar {
    pub child: Child,
    pub stdin: ChildStdin,
    pub reader: BufReader<ChildStdout>,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Spawns the daemon against `base_url`. Activity logging stays on unless
/// the caller overrides it through `envs`.
pub fn spawn_sidecar(base_url: &str, envs: &[(&str, &str)]) -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_rosterd");
    let mut cmd = Command::new(exe);
    cmd.env("ROSTERD_BASE_URL", base_url)
        .env("ROSTERD_TIMEOUT_MS", "5000")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().expect("spawn rosterd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
    }
}

impl Sidecar {
    pub fn send(&mut self, id: &str, method: &str, params: serde_json::Value) {
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");
    }

    pub fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).expect("write raw line");
        self.stdin.flush().expect("flush raw line");
    }

    pub fn read(&mut self) -> serde_json::Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response line");
        serde_json::from_str(line.trim()).expect("parse response json")
    }

    pub fn request(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.send(id, method, params);
        let value = self.read();
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
        value
    }

    pub fn request_ok(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or(serde_json::Value::Null)
    }

    /// Returns the error code and the whole error object.
    pub fn request_err(
        &mut self,
        id: &str,
        method: &str,
        params: serde_json::Value,
    ) -> (String, serde_json::Value) {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        let error = value.get("error").cloned().unwrap_or(serde_json::Value::Null);
        let code = error
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        (code, error)
    }

    /// Logs in as `u1` of "Hill School" and opens `screen`.
    pub fn login_and_open(&mut self, screen: &str) -> serde_json::Value {
        self.request_ok(
            "login",
            "session.login",
            json!({ "userId": "u1", "name": "Hill School", "token": "tok" }),
        );
        self.request_ok("open", "screen.open", json!({ "screen": screen }))
    }
}

pub fn row_ids(view: &serde_json::Value) -> Vec<String> {
    view.get("rows")
        .and_then(|v| v.as_array())
        .map(|rows| {
            rows.iter()
                .filter_map(|r| r.get("id").and_then(|v| v.as_str()).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn departments(prefix: &str, n: usize) -> serde_json::Value {
    let rows: Vec<_> = (1..=n)
        .map(|i| {
            json!({
                "_id": format!("{prefix}{i}"),
                "name": format!("Dept {i}"),
                "description": "",
                "createdAt": "2024-03-05T10:00:00.000Z"
            })
        })
        .collect();
    json!({ "data": rows })
}

/// Waits up to two seconds for the backend to see a request on `path`.
/// Activity-log writes happen after the response, so they need polling.
pub async fn requests_to(server: &wiremock::MockServer, path: &str) -> Vec<serde_json::Value> {
    for _ in 0..20 {
        let hits: Vec<serde_json::Value> = server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == path)
            .map(|r| serde_json::from_slice(&r.body).unwrap_or(serde_json::Value::Null))
            .collect();
        if !hits.is_empty() {
            return hits;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    Vec::new()
}

//! Isolated execution scope for untrusted payloads.
//!
//! The payload text becomes the body of an `AsyncFunction` constructed inside
//! the session's page, so it runs in the disposable Chromium process's V8
//! isolate rather than in this process. The function's parameter list is the
//! whole capability surface: `driver`, `session`, `page` and `logger`. Its
//! return value is the request's result; anything it throws comes back with
//! message and stack.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::CoreError;
use crate::exec::ExecutionResult;
use crate::session::Session;

/// Maximum object depth the in-page normalizer walks before stringifying.
const NORMALIZE_DEPTH: u32 = 6;

/// Build the wrapper expression evaluated in the page.
///
/// The payload is embedded as a JSON string literal and compiled inside the
/// page, never concatenated into the wrapper's own syntax, so payload text
/// cannot escape the function body.
pub(crate) fn build_scope(code: &str, session_id: &str, timeout_ms: u64, created_at: &str) -> String {
    let code_literal =
        serde_json::to_string(code).unwrap_or_else(|_| "\"\"".to_string());
    let id_literal =
        serde_json::to_string(session_id).unwrap_or_else(|_| "\"\"".to_string());
    let created_literal =
        serde_json::to_string(created_at).unwrap_or_else(|_| "\"\"".to_string());

    format!(
        r#"(async () => {{
  "use strict";
  const __logs = [];
  const __print = (level) => (...args) => {{
    try {{
      __logs.push(level + ': ' + args
        .map((a) => (typeof a === 'string' ? a : JSON.stringify(a)))
        .join(' '));
    }} catch (_) {{
      __logs.push(level + ': [unprintable]');
    }}
  }};
  const logger = Object.freeze({{
    debug: __print('debug'),
    info: __print('info'),
    log: __print('info'),
    warn: __print('warn'),
    error: __print('error'),
  }});

  const session = Object.freeze({{
    id: {id},
    timeoutMs: {timeout_ms},
    createdAt: {created},
  }});

  // Navigation destroys this execution context, so driver.goto never resolves
  // in-scope; the surrounding evaluate call surfaces the context loss as an
  // error. Scraping flows should use driver.fetch + driver.parse instead.
  const driver = Object.freeze({{
    fetch: async (url, options) => {{
      const resp = await fetch(url, options);
      return {{
        status: resp.status,
        ok: resp.ok,
        headers: Object.fromEntries(resp.headers.entries()),
        body: await resp.text(),
      }};
    }},
    parse: (html) => new DOMParser().parseFromString(html, 'text/html'),
    sleep: (ms) => new Promise((resolve) => setTimeout(resolve, ms)),
    goto: (url) => {{ location.assign(url); return new Promise(() => {{}}); }},
  }});

  const __require = (selector) => {{
    const el = document.querySelector(selector);
    if (!el) throw new Error('no element matches ' + selector);
    return el;
  }};
  const page = Object.freeze({{
    url: () => location.href,
    title: () => document.title,
    content: () => (document.documentElement ? document.documentElement.outerHTML : ''),
    text: (selector) => __require(selector).textContent,
    html: (selector) => __require(selector).innerHTML,
    attr: (selector, name) => __require(selector).getAttribute(name),
    all: (selector) => Array.from(document.querySelectorAll(selector)).map((el) => el.textContent),
    click: (selector) => {{ __require(selector).click(); }},
    type: (selector, text) => {{
      const el = __require(selector);
      el.focus();
      el.value = text;
      el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    }},
    waitFor: async (selector, timeoutMs) => {{
      const limit = timeoutMs === undefined ? {timeout_ms} : timeoutMs;
      const start = Date.now();
      while (Date.now() - start < limit) {{
        const el = document.querySelector(selector);
        if (el) return el.textContent;
        await new Promise((resolve) => setTimeout(resolve, 50));
      }}
      throw new Error('timed out waiting for ' + selector);
    }},
  }});

  const __normalize = (value, depth) => {{
    if (value === undefined || value === null) return null;
    const t = typeof value;
    if (t === 'number' || t === 'string' || t === 'boolean') return value;
    if (t === 'function' || t === 'symbol' || t === 'bigint') return String(value);
    if (depth >= {depth}) return String(value);
    if (Array.isArray(value)) return value.map((v) => __normalize(v, depth + 1));
    if (typeof Node !== 'undefined' && value instanceof Node) {{
      return value.outerHTML || String(value);
    }}
    const out = {{}};
    for (const key of Object.keys(value)) out[key] = __normalize(value[key], depth + 1);
    return out;
  }};

  try {{
    const AsyncFunction = Object.getPrototypeOf(async function () {{}}).constructor;
    const __code = {code};
    const __body = new AsyncFunction(
      'driver', 'session', 'page', 'logger',
      '"use strict";\n' + __code
    );
    const raw = await __body(driver, session, page, logger);
    return {{ ok: true, value: __normalize(raw, 0), logs: __logs }};
  }} catch (err) {{
    return {{
      ok: false,
      message: String((err && err.message) || err),
      stack: err && err.stack ? String(err.stack) : '',
      logs: __logs,
    }};
  }}
}})()"#,
        id = id_literal,
        timeout_ms = timeout_ms,
        created = created_literal,
        code = code_literal,
        depth = NORMALIZE_DEPTH,
    )
}

#[derive(Debug, Deserialize)]
struct ScopeOutcome {
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    stack: Option<String>,
    #[serde(default)]
    logs: Vec<String>,
}

/// Run the payload inside the session's page and capture its outcome.
///
/// CDP-level failures (per-operation timeout, connection loss, the execution
/// context being destroyed by a navigation) come back through the same error
/// path as payload throws.
pub async fn run(code: &str, session: &Session) -> Result<ExecutionResult, CoreError> {
    let wrapper = build_scope(
        code,
        &session.id().to_string(),
        session.timeout().as_millis() as u64,
        &session.created_at().to_rfc3339(),
    );

    let eval = session.page().evaluate(wrapper).await.map_err(|e| {
        log::error!("session {}: evaluation failed: {}", session.id(), e);
        CoreError::execution(e.to_string(), "")
    })?;

    let raw = eval.value().cloned().unwrap_or(Value::Null);
    let outcome: ScopeOutcome = serde_json::from_value(raw)
        .map_err(|e| CoreError::execution(format!("malformed scope outcome: {}", e), ""))?;

    for line in &outcome.logs {
        log::debug!(target: "payload", "session {}: {}", session.id(), line);
    }

    if outcome.ok {
        Ok(ExecutionResult {
            value: outcome.value,
        })
    } else {
        let message = outcome
            .message
            .unwrap_or_else(|| "execution failed".to_string());
        log::warn!("session {}: payload threw: {}", session.id(), message);
        Err(CoreError::execution(
            message,
            outcome.stack.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_binds_exactly_the_four_capability_handles() {
        let wrapper = build_scope("return 1;", "abc", 60_000, "2026-01-01T00:00:00Z");
        assert!(wrapper.contains("'driver', 'session', 'page', 'logger'"));
        assert!(wrapper.contains("\"use strict\""));
    }

    #[test]
    fn payload_is_embedded_as_a_json_literal() {
        let code = "const s = \"quo\\\"te\";\nreturn s;";
        let wrapper = build_scope(code, "abc", 1000, "2026-01-01T00:00:00Z");
        let literal = serde_json::to_string(code).unwrap();
        assert!(wrapper.contains(&literal));
        // The raw payload must not appear outside the literal, where it could
        // alter the wrapper's own syntax.
        assert_eq!(wrapper.matches(&literal).count(), 1);
    }

    #[test]
    fn session_metadata_is_injected() {
        let wrapper = build_scope("return 1;", "sess-42", 1234, "2026-01-01T00:00:00Z");
        assert!(wrapper.contains("\"sess-42\""));
        assert!(wrapper.contains("timeoutMs: 1234"));
    }

    #[test]
    fn outcome_parses_success_and_failure_shapes() {
        let ok: ScopeOutcome = serde_json::from_value(serde_json::json!({
            "ok": true, "value": {"n": 1}, "logs": ["info: hi"]
        }))
        .unwrap();
        assert!(ok.ok);
        assert_eq!(ok.value["n"], 1);
        assert_eq!(ok.logs.len(), 1);

        let err: ScopeOutcome = serde_json::from_value(serde_json::json!({
            "ok": false, "message": "boom", "stack": "Error: boom\n  at <anonymous>"
        }))
        .unwrap();
        assert!(!err.ok);
        assert_eq!(err.message.as_deref(), Some("boom"));
        assert!(err.stack.unwrap().contains("boom"));
    }
}

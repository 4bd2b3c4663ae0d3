//! Browser pages. Every route here sits behind the page gate.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};

use super::assist::sandboxed_document;
use crate::auth::RequireUser;
use crate::ai::CONNECTION_FALLBACK;
use crate::editor::{DOCUMENT_SHELL, SANDBOX_FLAGS, starter_code};
use crate::server::AppState;
use crate::store::MAX_PROJECTS_PER_OWNER;

pub fn page_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(editor_page))
        .route("/projects", get(projects_page))
        .route("/projects/{id}/preview", get(project_preview))
        .route("/setup", get(setup_page))
        .route("/login", get(login_page))
        .route("/register", get(register_page))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{} · Vibe Coder</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape_html(title)
    ))
}

/// Posts a form as JSON and follows up with `then` on success.
fn json_form_script(form_id: &str, endpoint: &str, then: &str) -> String {
    format!(
        r#"<p id="error" role="alert"></p>
<script>
document.getElementById('{form_id}').addEventListener('submit', async (event) => {{
  event.preventDefault();
  const body = Object.fromEntries(new FormData(event.target));
  const res = await fetch('{endpoint}', {{
    method: 'POST',
    headers: {{ 'Content-Type': 'application/json' }},
    body: JSON.stringify(body),
  }});
  const json = await res.json().catch(() => ({{}}));
  if (!res.ok) {{
    document.getElementById('error').textContent = json.error || 'Something went wrong';
    return;
  }}
  {then}
}});
</script>"#
    )
}

/// A JSON string literal that is safe to embed inside a `<script>` element.
fn script_literal(value: serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

/// The editor recomposes the preview in the page on every input, from the
/// same shell `compose` uses, so the frame always shows the latest buffers.
pub async fn editor_page() -> Html<String> {
    let code = starter_code();
    let shell = script_literal(serde_json::Value::from(DOCUMENT_SHELL.to_vec()));
    let fallback = script_literal(serde_json::Value::from(CONNECTION_FALLBACK));
    let body = format!(
        r#"<h1>Vibe Coder</h1>
<nav><a href="/projects">My projects</a></nav>
<textarea id="html" rows="10" cols="60">{html}</textarea>
<textarea id="css" rows="10" cols="60">{css}</textarea>
<textarea id="javascript" rows="10" cols="60">{js}</textarea>
<iframe id="preview" sandbox="{SANDBOX_FLAGS}" title="Preview"></iframe>
<form id="chat"><input name="message" placeholder="Ask the tutor"><button>Send</button></form>
<div id="answers"></div>
<script>
const SHELL = {shell};
const FALLBACK = {fallback};
const code = () => ({{
  html: document.getElementById('html').value,
  css: document.getElementById('css').value,
  javascript: document.getElementById('javascript').value,
}});
const escapeClosing = (text, tag) => text.replace(new RegExp('</(' + tag + ')', 'gi'), '<\\/$1');
function compose(c) {{
  return SHELL[0] + escapeClosing(c.css, 'style') + SHELL[1] + c.html
    + SHELL[2] + escapeClosing(c.javascript, 'script') + SHELL[3];
}}
function refresh() {{
  document.getElementById('preview').srcdoc = compose(code());
}}
const history = [];
async function ask(message) {{
  try {{
    const res = await fetch('/api/chat', {{
      method: 'POST',
      headers: {{ 'Content-Type': 'application/json' }},
      body: JSON.stringify({{ message, code: code(), history: history.slice(-10) }}),
    }});
    const json = await res.json();
    if (!res.ok || !json.data) throw new Error(json.error || res.statusText);
    return json.data;
  }} catch (error) {{
    console.error('Chat request failed:', error);
    return {{ message: {{ content: FALLBACK }}, blocks: [] }};
  }}
}}
document.querySelectorAll('textarea').forEach((t) => t.addEventListener('input', refresh));
document.getElementById('chat').addEventListener('submit', async (event) => {{
  event.preventDefault();
  const message = event.target.message.value;
  if (!message.trim()) return;
  event.target.message.value = '';
  const data = await ask(message);
  history.push({{ role: 'user', content: message }});
  history.push({{ role: 'assistant', content: data.message.content }});
  const answer = document.createElement('pre');
  answer.textContent = data.message.content;
  document.getElementById('answers').append(answer);
  for (const block of data.blocks) {{
    if (block.language === 'unrecognized') continue;
    const apply = document.createElement('button');
    apply.textContent = 'Apply to ' + block.language;
    apply.onclick = () => {{
      document.getElementById(block.language).value = block.code;
      apply.textContent = 'Applied';
      refresh();
    }};
    document.getElementById('answers').append(apply);
  }}
}});
refresh();
</script>"#,
        html = escape_html(&code.markup),
        css = escape_html(&code.style),
        js = escape_html(&code.script),
    );
    layout("Editor", &body)
}

pub async fn projects_page(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> Response {
    let projects = match state.store.list_projects(&auth.user.id) {
        Ok(projects) => projects,
        Err(e) => {
            tracing::error!("Failed to list projects: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                layout("Error", "<p>Could not load your projects.</p>"),
            )
                .into_response();
        }
    };

    let items: String = projects
        .iter()
        .map(|p| {
            format!(
                "<li><a href=\"/projects/{id}/preview\">{title}</a> <small>{updated}</small></li>\n",
                id = escape_html(&p.id),
                title = escape_html(&p.title),
                updated = p.updated_at.format("%Y-%m-%d %H:%M"),
            )
        })
        .collect();

    let body = format!(
        "<h1>My projects ({count}/{MAX_PROJECTS_PER_OWNER})</h1>\n<ul>\n{items}</ul>\n<a href=\"/\">Back to the editor</a>",
        count = projects.len(),
    );
    layout("Projects", &body).into_response()
}

pub async fn project_preview(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_project(&auth.user.id, &id) {
        Ok(Some(project)) => sandboxed_document(&project.code),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            layout("Not found", "<p>Project not found.</p>"),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to load project {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                layout("Error", "<p>Could not load this project.</p>"),
            )
                .into_response()
        }
    }
}

pub async fn setup_page() -> Html<String> {
    let body = format!(
        r#"<h1>Welcome! Set up your profile</h1>
<form id="setup">
<label>Your name <input name="displayName" required></label>
<label>New password <input name="newPassword" type="password" minlength="4" required></label>
<button>Save</button>
</form>
{}"#,
        json_form_script("setup", "/api/user/update-profile", "window.location.href = '/';")
    );
    layout("Profile setup", &body)
}

/// Two steps: the username is probed first, and the password field only
/// shows up for accounts that already finished setup.
pub async fn login_page() -> Html<String> {
    let body = r#"<h1>Log in</h1>
<form id="login">
<label>Username <input name="username" required></label>
<label id="password-row" hidden>Password <input name="password" type="password"></label>
<button>Continue</button>
</form>
<p id="error" role="alert"></p>
<a href="/register">Register with an invite code</a>
<script>
let probed = false;
document.getElementById('login').addEventListener('submit', async (event) => {
  event.preventDefault();
  const form = event.target;
  const post = (url, body) => fetch(url, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(body),
  });
  if (!probed) {
    const res = await post('/api/auth/check-username', { username: form.username.value });
    const json = await res.json();
    if (!json.data || !json.data.exists) {
      document.getElementById('error').textContent = 'Unknown username';
      return;
    }
    if (!json.data.firstLogin) {
      probed = true;
      document.getElementById('password-row').hidden = false;
      return;
    }
  }
  const res = await post('/api/auth/login', {
    username: form.username.value,
    password: form.password.value,
  });
  if (!res.ok) {
    document.getElementById('error').textContent = 'Invalid username or password';
    return;
  }
  const json = await res.json();
  window.location.href = json.data.user.firstLogin ? '/setup' : '/';
});
</script>"#;
    layout("Log in", body)
}

pub async fn register_page() -> Html<String> {
    let body = format!(
        r#"<h1>Register</h1>
<form id="register">
<label>Invite code <input name="inviteCode" required></label>
<label>Username <input name="username" minlength="3" required></label>
<label>Your name <input name="displayName" required></label>
<label>Password <input name="password" type="password" minlength="4" required></label>
<button>Create account</button>
</form>
{}"#,
        json_form_script("register", "/api/auth/register", "window.location.href = '/';")
    );
    layout("Register", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom & Jerry's\"</b>"),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[tokio::test]
    async fn test_editor_page_embeds_escaped_starter() {
        let Html(page) = editor_page().await;
        assert!(page.contains("&lt;h1&gt;Welkom bij Vibe Coder!&lt;/h1&gt;"));
        assert!(page.contains("sandbox=\"allow-scripts allow-modals\""));
    }

    #[tokio::test]
    async fn test_editor_page_composes_locally() {
        let Html(page) = editor_page().await;
        assert!(!page.contains("/api/preview"));
        assert!(page.contains("const SHELL = [\"<!DOCTYPE html>"));
        // The embedded shell must not close the page's own script element.
        assert_eq!(page.matches("</script>").count(), 1);
        assert!(page.contains(&script_literal(serde_json::Value::from(CONNECTION_FALLBACK))));
    }

    #[test]
    fn test_script_literal_escapes_closing_tags() {
        let literal = script_literal(serde_json::Value::from("</style></script>"));
        assert_eq!(literal, "\"<\\/style><\\/script>\"");
    }
}

use std::path::PathBuf;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use vishop_core::config::ScriptType;
use vishop_core::contract::{NewScript, NewVersion, ScriptDetails, ScriptSite};
use vishop_core::session::Credentials;
use vishop_core::site::VimOrgClient;
use vishop_core::VishopError;

const ACCOUNT_PAGE: &str = r#"<html><body><table>
<tr><td>user name</td><td>me</td></tr>
<tr><td>first name</td><td>Some</td></tr>
<tr><td>last name</td><td>One</td></tr>
<tr><td>email</td><td>me@example.org</td></tr>
</table>
<h1>Script Contributions</h1>
<table><tr><td><a href="/scripts/script.php?script_id=7">Foo</a></td><td>does foo</td></tr></table>
</body></html>"#;

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read one request: the head, then a body sized by Content-Length or chunked framing.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = buf.len() - end - 4;
            let content_length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            let complete = match content_length {
                Some(len) => body_len >= len,
                None if head.contains("transfer-encoding: chunked") => buf.ends_with(b"0\r\n\r\n"),
                None => true,
            };
            if complete {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn reply(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let extra: String = headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}\r\n"))
        .collect();
    format!(
        "HTTP/1.1 {status}\r\n{extra}content-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Serve `replies` in order, one connection each, and hand back the raw requests.
async fn serve(replies: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for reply in replies {
            let (mut stream, _) = listener.accept().await.unwrap();
            seen.push(read_request(&mut stream).await);
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
        seen
    });
    (base, handle)
}

fn credentials() -> Credentials {
    Credentials {
        username: "me".into(),
        password: "pw".into(),
    }
}

fn header_line(request: &str, name: &str) -> Option<String> {
    request
        .lines()
        .find(|l| l.to_lowercase().starts_with(&format!("{name}:")))
        .map(|l| l[name.len() + 1..].trim().to_string())
}

#[tokio::test]
async fn login_carries_cookie_and_referer_into_later_requests() {
    let (base, server) = serve(vec![
        reply(
            "302 Found",
            &[
                ("location", "/account/index.php?login=1"),
                ("set-cookie", "sid=abc; Path=/; HttpOnly"),
            ],
            "",
        ),
        reply("200 OK", &[], "<p>Welcome back</p>"),
        reply("200 OK", &[], ACCOUNT_PAGE),
    ])
    .await;

    let mut client = VimOrgClient::new(&base).unwrap();
    client.login(&credentials()).await.unwrap();
    let account = client.fetch_account().await.unwrap();
    assert_eq!(account.user_name, "me");
    assert_eq!(account.find_script("Foo").unwrap().id, "7");

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /login.php "));
    assert!(requests[0].contains("userName=me"));
    assert_eq!(
        header_line(&requests[0], "referer").as_deref(),
        Some(format!("{base}/login.php").as_str())
    );
    assert_eq!(header_line(&requests[0], "cookie"), None);

    assert!(requests[1].starts_with("GET /account/index.php?login=1 "));
    assert_eq!(header_line(&requests[1], "cookie").as_deref(), Some("sid=abc"));

    assert!(requests[2].starts_with("GET /account/index.php "));
    assert_eq!(header_line(&requests[2], "cookie").as_deref(), Some("sid=abc"));
    assert_eq!(
        header_line(&requests[2], "referer").as_deref(),
        Some(format!("{base}/account/index.php?login=1").as_str())
    );
    assert_eq!(client.session().cookie("sid"), Some("abc"));
}

#[tokio::test]
async fn bad_credentials_fail_on_the_landing_page() {
    let (base, server) = serve(vec![
        reply("302 Found", &[("location", "/login.php?failed=1")], ""),
        reply("200 OK", &[], "<p>Authentication failed</p>"),
    ])
    .await;

    let mut client = VimOrgClient::new(&base).unwrap();
    let err = client.login(&credentials()).await.unwrap_err();
    assert!(matches!(err, VishopError::Authentication));
    server.await.unwrap();
}

#[tokio::test]
async fn login_page_without_redirect_is_rate_limited() {
    let (base, server) = serve(vec![reply("200 OK", &[], "Please try again later.")]).await;

    let mut client = VimOrgClient::new(&base).unwrap();
    let err = client.login(&credentials()).await.unwrap_err();
    assert!(matches!(err, VishopError::RateLimit(_)));
    server.await.unwrap();
}

fn archive() -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Foo-1.0.zip");
    std::fs::write(&path, b"PK fake archive").unwrap();
    (dir, path)
}

#[tokio::test]
async fn upload_without_redirect_is_upload_failed() {
    let (base, server) = serve(vec![reply("200 OK", &[], "form shown again")]).await;
    let (_dir, path) = archive();

    let mut client = VimOrgClient::new(&base).unwrap();
    let err = client
        .upload_script(&NewScript {
            name: "Foo".into(),
            script_type: ScriptType::Utility,
            vim_version: "7.0".into(),
            version: "1.0".into(),
            summary: "does foo".into(),
            description: "long".into(),
            install_details: String::new(),
            archive: path,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, VishopError::UploadFailed(200)));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /scripts/add_script.php "));
    assert!(requests[0].contains("name=\"script_type\"\r\n\r\nutility"));
    assert!(requests[0].contains("filename=\"Foo-1.0.zip\""));
}

#[tokio::test]
async fn version_upload_follows_the_redirect_and_maps_failures() {
    let (base, server) = serve(vec![
        reply(
            "302 Found",
            &[("location", "/scripts/script.php?script_id=7")],
            "",
        ),
        reply("500 Internal Server Error", &[], "boom"),
    ])
    .await;
    let (_dir, path) = archive();
    let version = NewVersion {
        script_id: "7".into(),
        vim_version: "7.0".into(),
        version: "1.1".into(),
        comment: "fixes".into(),
        archive: path,
    };

    let mut client = VimOrgClient::new(&base).unwrap();
    let url = client.add_version(&version).await.unwrap();
    assert_eq!(url, format!("{base}/scripts/script.php?script_id=7"));
    assert_eq!(client.session().referer(), Some(url.as_str()));

    let err = client.add_version(&version).await.unwrap_err();
    assert!(matches!(err, VishopError::UpdateFailed(500)));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /scripts/add_script_version.php?script_id=7 "));
    assert!(requests[0].contains("name=\"version_comment\"\r\n\r\nfixes"));
}

#[tokio::test]
async fn rejected_details_form_is_details_update_failed() {
    let (base, server) = serve(vec![reply("403 Forbidden", &[], "")]).await;

    let mut client = VimOrgClient::new(&base).unwrap();
    let err = client
        .update_details(
            "7",
            &ScriptDetails {
                name: "Foo".into(),
                summary: "does foo".into(),
                description: "long".into(),
                install_details: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VishopError::DetailsUpdateFailed(403)));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /scripts/edit_script.php?script_id=7 "));
    assert!(requests[0].contains("save=update"));
}

use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER, SET_COOKIE, USER_AGENT};
use vishop_core::contract::MockPrompter;
use vishop_core::session::{
    authenticate, check_login_landing, check_login_response, SessionContext, DEFAULT_USER_AGENT,
};
use vishop_core::VishopError;

#[test]
fn fresh_session_sends_only_the_user_agent() {
    let headers = SessionContext::default().headers();
    assert_eq!(headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
    assert!(headers.get(REFERER).is_none());
    assert!(headers.get(COOKIE).is_none());
}

#[test]
fn navigation_and_cookies_shape_the_headers() {
    let mut session = SessionContext::new("test-agent");
    session.navigate("https://www.vim.org/login.php");
    session.absorb_set_cookie("vimorg_user=abc123; path=/; HttpOnly");
    session.absorb_set_cookie("lang=en");
    session.absorb_set_cookie("garbage");
    session.navigate("https://www.vim.org/account/index.php");

    assert_eq!(session.cookie("vimorg_user"), Some("abc123"));
    let headers = session.headers();
    assert_eq!(
        headers.get(REFERER).unwrap(),
        "https://www.vim.org/account/index.php"
    );
    assert_eq!(headers.get(COOKIE).unwrap(), "lang=en; vimorg_user=abc123");
}

#[test]
fn every_set_cookie_header_is_absorbed() {
    let mut response = HeaderMap::new();
    response.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
    response.append(SET_COOKIE, HeaderValue::from_static("b=2"));
    response.append(SET_COOKIE, HeaderValue::from_static("a=3"));

    let mut session = SessionContext::default();
    session.absorb_response_headers(&response);
    assert_eq!(session.cookie_header().as_deref(), Some("a=3; b=2"));
}

#[test]
fn non_interactive_without_password_fails_before_prompting() {
    let prompter = MockPrompter::new();
    let err = authenticate(Some("me".into()), None, false, &prompter).unwrap_err();
    assert!(matches!(err, VishopError::Credential(_)));
}

#[test]
fn interactive_prompts_only_for_missing_values() {
    let mut prompter = MockPrompter::new();
    prompter.expect_input().never();
    prompter
        .expect_password()
        .withf(|prompt| prompt == "password")
        .times(1)
        .returning(|_| Ok("s3cret".into()));

    let creds = authenticate(Some("me".into()), None, true, &prompter).unwrap();
    assert_eq!(creds.username, "me");
    assert_eq!(creds.password, "s3cret");
    assert!(!format!("{creds:?}").contains("s3cret"));
}

#[test]
fn empty_values_count_as_missing() {
    let mut prompter = MockPrompter::new();
    prompter
        .expect_input()
        .times(1)
        .returning(|_| Ok("typed".into()));
    prompter.expect_password().never();

    let creds = authenticate(Some(String::new()), Some("pw".into()), true, &prompter).unwrap();
    assert_eq!(creds.username, "typed");
}

#[test]
fn login_response_classification() {
    assert!(check_login_response(302, "").is_ok());
    assert!(matches!(
        check_login_response(200, "Too many attempts, try again later."),
        Err(VishopError::RateLimit(_))
    ));
    assert!(matches!(
        check_login_response(200, "<html>login</html>"),
        Err(VishopError::UnexpectedResponse(_))
    ));
    assert!(matches!(
        check_login_response(500, ""),
        Err(VishopError::UnexpectedResponse(_))
    ));
}

#[test]
fn landing_page_reports_bad_credentials() {
    assert!(matches!(
        check_login_landing("<p>Authentication failed</p>"),
        Err(VishopError::Authentication)
    ));
    assert!(check_login_landing("<p>Welcome back</p>").is_ok());
}

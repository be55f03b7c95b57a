use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use shed_dingtalk::{At, ButtonOrientation, DingTalk, DingTalkError};

const OK: &str = r#"{"errcode":0,"errmsg":"ok"}"#;

fn robot(server: &ServerGuard) -> DingTalk {
    DingTalk::builder()
        .access_token("token-1")
        .endpoint(format!("{}/robot/send", server.url()))
        .init()
        .expect("robot")
}

#[tokio::test]
async fn text_messages_post_the_documented_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/robot/send")
        .match_query(Matcher::UrlEncoded("access_token".into(), "token-1".into()))
        .match_body(Matcher::Json(json!({
            "msgtype": "text",
            "text": { "content": "hello" },
            "at": { "atMobiles": ["13800000001"], "isAtAll": false },
        })))
        .with_body(OK)
        .create_async()
        .await;

    let reply =
        robot(&server).send_text("hello", At::mobiles("13800000001")).await.expect("send");
    assert_eq!(reply["errmsg"], "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn signed_requests_carry_timestamp_and_sign() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/robot/send")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("access_token".into(), "token-1".into()),
            Matcher::Regex("timestamp=\\d+".into()),
            Matcher::Regex("sign=[A-Za-z0-9%]+".into()),
        ]))
        .with_body(OK)
        .create_async()
        .await;

    let signed = DingTalk::builder()
        .access_token("token-1")
        .secret("SECtest")
        .endpoint(format!("{}/robot/send", server.url()))
        .init()
        .expect("robot");
    signed.send_text("ping", At::nobody()).await.expect("send");
    mock.assert_async().await;
}

#[tokio::test]
async fn error_codes_surface_as_api_errors() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/robot/send")
        .match_query(Matcher::Any)
        .with_body(r#"{"errcode":310000,"errmsg":"keywords not in content"}"#)
        .create_async()
        .await;

    let error = robot(&server).send_text("hi", At::nobody()).await.expect_err("must fail");
    match error {
        DingTalkError::Api { code, message, .. } => {
            assert_eq!(code, 310_000);
            assert!(message.contains("keywords"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn markdown_mentions_ride_in_the_at_block() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/robot/send")
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({
            "msgtype": "markdown",
            "markdown": { "title": "Release", "text": "## shipped" },
            "at": { "atMobiles": [], "isAtAll": true },
        })))
        .with_body(OK)
        .create_async()
        .await;

    robot(&server).send_markdown("Release", "## shipped", At::everyone()).await.expect("send");
    mock.assert_async().await;
}

#[tokio::test]
async fn markdown_templates_read_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("release.md");
    std::fs::write(&template, "## {__title}\n\nState: {state}").expect("write template");

    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/robot/send")
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({
            "msgtype": "markdown",
            "markdown": { "title": "Release", "text": "## Release\n\nState: shipped" },
            "at": { "atMobiles": [], "isAtAll": false },
        })))
        .with_body(OK)
        .create_async()
        .await;

    robot(&server)
        .send_markdown_file("Release", &template, &[("state", "shipped")], At::nobody())
        .await
        .expect("send");
    mock.assert_async().await;
}

#[tokio::test]
async fn blank_and_missing_templates_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blank = dir.path().join("blank.md");
    std::fs::write(&blank, "  \n\t\n").expect("write template");

    let server = Server::new_async().await;
    let robot = robot(&server);

    let error = robot
        .send_markdown_file("t", &blank, &[], At::nobody())
        .await
        .expect_err("must fail");
    assert!(matches!(error, DingTalkError::Validation { .. }));

    let error = robot
        .send_markdown_file("t", dir.path().join("absent.md"), &[], At::nobody())
        .await
        .expect_err("must fail");
    assert!(matches!(error, DingTalkError::Io { .. }));
}

#[tokio::test]
async fn links_post_without_mentions() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/robot/send")
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({
            "msgtype": "link",
            "link": {
                "title": "Changelog",
                "text": "What shipped this week",
                "messageUrl": "https://example.com/changelog",
                "picUrl": "https://example.com/banner.png",
            },
        })))
        .with_body(OK)
        .create_async()
        .await;

    robot(&server)
        .send_link(
            "Changelog",
            "What shipped this week",
            "https://example.com/changelog",
            "https://example.com/banner.png",
        )
        .await
        .expect("send");
    mock.assert_async().await;
}

#[tokio::test]
async fn single_buttons_use_the_overall_form() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/robot/send")
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({
            "msgtype": "actionCard",
            "actionCard": {
                "title": "Review",
                "text": "A change needs eyes",
                "singleTitle": "Open diff",
                "singleURL": "https://example.com/diff",
                "btnOrientation": "0",
                "hideAvatar": "0",
            },
        })))
        .with_body(OK)
        .create_async()
        .await;

    robot(&server)
        .send_action_card(
            "Review",
            "A change needs eyes",
            &[("Open diff", "https://example.com/diff")],
            ButtonOrientation::Vertical,
            false,
        )
        .await
        .expect("send");
    mock.assert_async().await;
}

#[tokio::test]
async fn button_lists_render_with_orientation_flags() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/robot/send")
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({
            "msgtype": "actionCard",
            "actionCard": {
                "title": "Vote",
                "text": "Pick one",
                "btns": [
                    { "title": "Yes", "actionURL": "https://example.com/yes" },
                    { "title": "No", "actionURL": "https://example.com/no" },
                ],
                "btnOrientation": "1",
                "hideAvatar": "1",
            },
        })))
        .with_body(OK)
        .create_async()
        .await;

    robot(&server)
        .send_action_card(
            "Vote",
            "Pick one",
            &[("Yes", "https://example.com/yes"), ("No", "https://example.com/no")],
            ButtonOrientation::Horizontal,
            true,
        )
        .await
        .expect("send");
    mock.assert_async().await;
}

#[tokio::test]
async fn feed_cards_omit_empty_picture_urls() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/robot/send")
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({
            "msgtype": "feedCard",
            "feedCard": {
                "links": [
                    {
                        "title": "With picture",
                        "messageURL": "https://example.com/a",
                        "picURL": "https://example.com/a.png",
                    },
                    { "title": "Without picture", "messageURL": "https://example.com/b" },
                ],
            },
        })))
        .with_body(OK)
        .create_async()
        .await;

    robot(&server)
        .send_feed_card(&[
            ("With picture", "https://example.com/a", "https://example.com/a.png"),
            ("Without picture", "https://example.com/b", ""),
        ])
        .await
        .expect("send");
    mock.assert_async().await;
}

#[tokio::test]
async fn raw_bodies_pass_through_untouched() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/robot/send")
        .match_body(Matcher::Json(json!({ "msgtype": "empty" })))
        .with_body(OK)
        .create_async()
        .await;

    robot(&server).send_raw(json!({ "msgtype": "empty" })).await.expect("send");
    mock.assert_async().await;
}

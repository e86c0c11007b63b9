use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{self, Request};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;

use lens_database::basic_db::{InnerDatabase, SafeDatabase};

use crate::auth::*;
use crate::config::Config;
use crate::home::home;
use crate::media::*;
use crate::pages::*;
use crate::post::*;
use crate::profile::*;
use crate::router::*;
use crate::state::AppState;

/// The full application router, without transport-level layers.
pub fn build_app<T: SafeDatabase>(state: AppState<T>) -> Router {
    let body_limit = state.config.max_upload_bytes;
    let components = collect_components::<T>();

    main_router(components, state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CookieManagerLayer::new())
}

pub async fn build_server(config: Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;
    let database = InnerDatabase::new(&config.data_dir)?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(database, config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers(Any)
        .allow_credentials(false);

    let app = build_app(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "starting lens server");

    axum::serve(listener, app).await?;
    Ok(())
}



fn collect_components<T: SafeDatabase>() -> Vec<(String, Router<AppState<T>>)> {
    let router_home = get_router_builder("/".to_string(), home::<T>);

    // 인증
    let router_login = form_router_builder("/login".to_string(), login_form::<T>, login_submit::<T>);
    let router_register = form_router_builder("/register".to_string(), register_form::<T>, register_submit::<T>);
    let router_logout = get_router_builder("/logout".to_string(), logout::<T>);

    // 프로필
    let router_profile_detail = form_router_builder("/profile_detail/{pk}".to_string(), profile_detail::<T>, profile_follow::<T>);
    let router_profile_list = get_router_builder("/profile_list".to_string(), profile_list::<T>);
    let router_profile_update = form_router_builder("/profile_update/{pk}".to_string(), profile_update_form::<T>, profile_update_submit::<T>);

    let router_post_create = form_router_builder("/post_create".to_string(), post_create_form::<T>, post_create_submit::<T>);

    let router_profile_picture = get_router_builder("/profile_picture/{pk}".to_string(), profile_picture::<T>);
    let router_post_image = get_router_builder("/post_image/{pk}".to_string(), post_image::<T>);

    let router_legal = get_router_builder("/legal".to_string(), legal::<T>);
    let router_contact = get_router_builder("/contact".to_string(), contact::<T>);

    vec![
        router_home,
        router_login,
        router_register,
        router_logout,

        router_profile_detail,
        router_profile_list,
        router_profile_update,

        router_post_create,
        router_profile_picture,
        router_post_image,

        router_legal,
        router_contact,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method, StatusCode};
    use axum::response::Response;
    use lens_service::parser::profile::UserProfile;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    const PASSWORD: &str = "password123";

    struct TestApp {
        _dir: TempDir,
        state: AppState<InnerDatabase>,
    }

    impl TestApp {
        fn new() -> Self {
            Self::with_config(Config::default())
        }

        fn with_config(config: Config) -> Self {
            let dir = tempdir().unwrap();
            let database = InnerDatabase::new(dir.path().join("test_db")).unwrap();
            let state = AppState::new(database, config);
            Self { _dir: dir, state }
        }

        /// Registers a user and logs them in, returning their profile and session token.
        fn member(&self, username: &str) -> (UserProfile, String) {
            let (user, profile) = self.state.store.create_user(username, PASSWORD).unwrap();
            let token = self.state.store.start_session(user.id).unwrap();
            (profile, token)
        }

        async fn send(&self, request: Request<Body>) -> Response {
            build_app(self.state.clone()).oneshot(request).await.unwrap()
        }

        async fn get(&self, uri: &str, token: Option<&str>) -> Response {
            let mut builder = Request::builder().uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::COOKIE, format!("sessionid={token}"));
            }
            self.send(builder.body(Body::empty()).unwrap()).await
        }

        async fn post_form(&self, uri: &str, body: &str, token: Option<&str>) -> Response {
            let mut builder = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            if let Some(token) = token {
                builder = builder.header(header::COOKIE, format!("sessionid={token}"));
            }
            self.send(builder.body(Body::from(body.to_string())).unwrap()).await
        }

        async fn post_multipart(
            &self,
            uri: &str,
            fields: Vec<(&str, &str)>,
            file_field: Option<(&str, &str, &[u8])>,
            token: &str,
        ) -> Response {
            let (content_type, body) = create_multipart_body(fields, file_field);
            let request = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::COOKIE, format!("sessionid={token}"))
                .body(Body::from(body))
                .unwrap();
            self.send(request).await
        }
    }

    fn create_multipart_body(fields: Vec<(&str, &str)>, file_field: Option<(&str, &str, &[u8])>) -> (String, Vec<u8>) {
        let boundary = "test_boundary";
        let mut body = Vec::new();

        for (name, value) in fields {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }

        if let Some((name, filename, data)) = file_field {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            ).as_bytes());
            body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        (format!("multipart/form-data; boundary={}", boundary), body)
    }

    fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::new_rgb8(2, 2)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    fn sets_cookie(response: &Response, name: &str) -> bool {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .any(|v| v.to_str().unwrap().starts_with(&format!("{name}=")))
    }

    #[tokio::test]
    async fn anonymous_home_shows_five_newest_posts() {
        let app = TestApp::new();
        let (author, _) = app.member("ana");
        for n in 1..=7 {
            app.state.store.create_post(&author, &format!("caption number {n}"), None).unwrap();
        }

        let response = app.get("/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;

        for n in 3..=7 {
            assert!(html.contains(&format!("caption number {n}")), "missing post {n}");
        }
        assert!(!html.contains("caption number 2"));
        assert!(!html.contains("caption number 1"));
        let newest = html.find("caption number 7").unwrap();
        let oldest_shown = html.find("caption number 3").unwrap();
        assert!(newest < oldest_shown);
    }

    #[tokio::test]
    async fn member_feed_only_has_followed_profiles() {
        let app = TestApp::new();
        let (reader, token) = app.member("reader");
        let (followed, _) = app.member("followed");
        let (stranger, _) = app.member("stranger");

        app.state.store.create_post(&followed, "from the followed one", None).unwrap();
        app.state.store.create_post(&stranger, "from the stranger", None).unwrap();
        app.state.store.toggle_follow(reader.id, followed.id).unwrap();

        let html = body_text(app.get("/", Some(&token)).await).await;

        assert!(html.contains("from the followed one"));
        assert!(!html.contains("from the stranger"));
    }

    #[tokio::test]
    async fn follow_form_toggles_relation() {
        let app = TestApp::new();
        let (ana, token) = app.member("ana");
        let (bo, _) = app.member("bo");
        let uri = format!("/profile_detail/{}", bo.id);
        let body = format!("profile_pk={}", bo.id);

        let response = app.post_form(&uri, &body, Some(&token)).await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), uri);
        assert!(sets_cookie(&response, "_flash"));
        assert!(app.state.store.is_following(ana.id, bo.id).unwrap());

        app.post_form(&uri, &body, Some(&token)).await;
        assert!(!app.state.store.is_following(ana.id, bo.id).unwrap());

        app.post_form(&uri, &body, Some(&token)).await;
        assert!(app.state.store.is_following(ana.id, bo.id).unwrap());
    }

    #[tokio::test]
    async fn following_state_shows_on_profile_page() {
        let app = TestApp::new();
        let (ana, token) = app.member("ana");
        let (bo, _) = app.member("bo");
        let uri = format!("/profile_detail/{}", bo.id);

        let html = body_text(app.get(&uri, Some(&token)).await).await;
        assert!(html.contains(">Follow<"));

        app.state.store.toggle_follow(ana.id, bo.id).unwrap();
        let html = body_text(app.get(&uri, Some(&token)).await).await;
        assert!(html.contains(">Unfollow<"));
        assert!(html.contains("1 followers"));
    }

    #[tokio::test]
    async fn follow_unknown_profile_is_404() {
        let app = TestApp::new();
        let (ana, token) = app.member("ana");
        let uri = format!("/profile_detail/{}", ana.id);

        let response = app.post_form(&uri, "profile_pk=999", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.get("/profile_detail/999", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_follow_form_is_redisplayed() {
        let app = TestApp::new();
        let (ana, token) = app.member("ana");
        let (bo, _) = app.member("bo");
        let uri = format!("/profile_detail/{}", bo.id);

        let response = app.post_form(&uri, "profile_pk=abc", Some(&token)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("Invalid follow request."));
        assert!(html.contains(">Follow<"));
        assert!(!app.state.store.is_following(ana.id, bo.id).unwrap());
    }

    #[tokio::test]
    async fn anonymous_post_with_bad_body_redirects_to_login() {
        let app = TestApp::new();
        let (bo, _) = app.member("bo");

        let response = app
            .post_form(&format!("/profile_detail/{}", bo.id), "profile_pk=abc", None)
            .await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/login");

        let response = app.post_form("/post_create", "caption=hi", None).await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn self_follow_is_refused_with_message() {
        let app = TestApp::new();
        let (ana, token) = app.member("ana");
        let uri = format!("/profile_detail/{}", ana.id);

        let response = app.post_form(&uri, &format!("profile_pk={}", ana.id), Some(&token)).await;
        assert!(response.status().is_redirection());
        assert!(!app.state.store.is_following(ana.id, ana.id).unwrap());
    }

    #[tokio::test]
    async fn non_owner_is_redirected_from_update() {
        let app = TestApp::new();
        let (_, token) = app.member("ana");
        let (bo, _) = app.member("bo");
        let uri = format!("/profile_update/{}", bo.id);

        let response = app.get(&uri, Some(&token)).await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");

        let response = app
            .post_multipart(&uri, vec![("bio", "hijacked"), ("birth_date", "")], None, &token)
            .await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");
        assert!(app.state.store.profile(bo.id).unwrap().unwrap().bio.is_empty());
    }

    #[tokio::test]
    async fn non_owner_urlencoded_update_is_redirected_home() {
        let app = TestApp::new();
        let (_, token) = app.member("ana");
        let (bo, _) = app.member("bo");

        let response = app
            .post_form(&format!("/profile_update/{}", bo.id), "bio=hijacked", Some(&token))
            .await;

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");
        assert!(app.state.store.profile(bo.id).unwrap().unwrap().bio.is_empty());
    }

    #[tokio::test]
    async fn owner_non_multipart_update_is_redisplayed() {
        let app = TestApp::new();
        let (ana, token) = app.member("ana");

        let response = app
            .post_form(&format!("/profile_update/{}", ana.id), "bio=plain", Some(&token))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("id_bio"));
        assert!(app.state.store.profile(ana.id).unwrap().unwrap().bio.is_empty());
    }

    #[tokio::test]
    async fn upload_and_clear_together_is_refused() {
        let app = TestApp::new();
        let (ana, token) = app.member("ana");
        let png = tiny_png();

        let response = app
            .post_multipart(
                &format!("/profile_update/{}", ana.id),
                vec![("bio", "both"), ("birth_date", ""), ("profile_picture-clear", "on")],
                Some(("profile_picture", "me.png", &png)),
                &token,
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("not both."));
        let profile = app.state.store.profile(ana.id).unwrap().unwrap();
        assert!(profile.profile_picture.is_none());
        assert!(profile.bio.is_empty());
    }

    #[tokio::test]
    async fn owner_updates_profile_and_picture() {
        let app = TestApp::new();
        let (ana, token) = app.member("ana");
        let uri = format!("/profile_update/{}", ana.id);
        let png = tiny_png();

        let response = app.get(&uri, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .post_multipart(
                &uri,
                vec![("bio", "street photography"), ("birth_date", "1991-02-03")],
                Some(("profile_picture", "me.png", &png)),
                &token,
            )
            .await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), format!("/profile_detail/{}", ana.id));

        let updated = app.state.store.profile(ana.id).unwrap().unwrap();
        assert_eq!(updated.bio, "street photography");
        assert_eq!(updated.birth_date.unwrap().to_string(), "1991-02-03");

        let response = app.get(&format!("/profile_picture/{}", ana.id), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.to_vec(), png);
    }

    #[tokio::test]
    async fn invalid_profile_submission_is_redisplayed() {
        let app = TestApp::new();
        let (ana, token) = app.member("ana");
        let uri = format!("/profile_update/{}", ana.id);

        let response = app
            .post_multipart(
                &uri,
                vec![("bio", "ok"), ("birth_date", "not a date")],
                Some(("profile_picture", "fake.png", b"plain text".as_slice())),
                &token,
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("Enter a valid date."));
        assert!(html.contains("Upload a valid image."));
        assert!(app.state.store.profile(ana.id).unwrap().unwrap().bio.is_empty());
    }

    #[tokio::test]
    async fn login_with_correct_credentials_redirects_home() {
        let app = TestApp::new();
        app.state.store.create_user("ana", PASSWORD).unwrap();

        let response = app
            .post_form("/login", &format!("username=ana&password={PASSWORD}"), None)
            .await;

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");
        assert!(sets_cookie(&response, "sessionid"));
        let session_cookie = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .find(|v| v.starts_with("sessionid="))
            .unwrap();
        assert!(session_cookie.contains("Max-Age=1209600"), "{session_cookie}");
    }

    #[tokio::test]
    async fn login_with_wrong_credentials_redisplays_form() {
        let app = TestApp::new();
        app.state.store.create_user("ana", PASSWORD).unwrap();

        let response = app.post_form("/login", "username=ana&password=nope", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!sets_cookie(&response, "sessionid"));
        let html = body_text(response).await;
        assert!(html.contains("Invalid username or password."));
        assert!(html.contains("name=\"password\""));
    }

    #[tokio::test]
    async fn login_with_empty_fields_is_rejected() {
        let app = TestApp::new();

        let response = app.post_form("/login", "username=&password=", None).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("This field is required."));
    }

    #[tokio::test]
    async fn registration_creates_profile_and_redirects_to_login() {
        let app = TestApp::new();

        let response = app
            .post_form("/register", "username=newbie&password1=longpassword&password2=longpassword", None)
            .await;

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/login");
        let user = app.state.store.user_by_username("newbie").unwrap().unwrap();
        assert!(app.state.store.profile_for_user(user.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn registration_errors_are_redisplayed() {
        let app = TestApp::new();
        app.state.store.create_user("taken", PASSWORD).unwrap();

        let response = app
            .post_form("/register", "username=taken&password1=longpassword&password2=longpassword", None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("A user with that username already exists."));

        let response = app
            .post_form("/register", "username=fresh&password1=longpassword&password2=different1", None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("The two password fields did not match."));
        assert!(app.state.store.user_by_username("fresh").unwrap().is_none());
    }

    #[tokio::test]
    async fn login_required_pages_redirect_anonymous_visitors() {
        let app = TestApp::new();
        let (bo, _) = app.member("bo");

        for uri in [
            "/profile_list".to_string(),
            "/post_create".to_string(),
            format!("/profile_detail/{}", bo.id),
            format!("/profile_update/{}", bo.id),
        ] {
            let response = app.get(&uri, None).await;
            assert!(response.status().is_redirection(), "{uri}");
            assert_eq!(location(&response), "/login", "{uri}");
        }
    }

    #[tokio::test]
    async fn profile_list_excludes_requester() {
        let app = TestApp::new();
        let (_, token) = app.member("mia");
        app.member("zoe");
        app.member("ana");

        let html = body_text(app.get("/profile_list", Some(&token)).await).await;

        let ana = html.find(">ana<").unwrap();
        let zoe = html.find(">zoe<").unwrap();
        assert!(ana < zoe);
        // the requester still shows in the navigation bar, never in the list
        assert_eq!(html.matches(">mia<").count(), 1);
    }

    #[tokio::test]
    async fn logout_ends_session() {
        let app = TestApp::new();
        let (_, token) = app.member("ana");

        let response = app.get("/logout", Some(&token)).await;

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");
        assert!(app.state.store.session_user(&token).unwrap().is_none());
    }

    #[tokio::test]
    async fn member_publishes_post_with_image() {
        let app = TestApp::new();
        let (_, token) = app.member("ana");
        let png = tiny_png();

        let response = app
            .post_multipart("/post_create", vec![("caption", "first light")], Some(("image", "p.png", &png)), &token)
            .await;
        assert!(response.status().is_redirection());

        let post = app.state.store.recent_posts(1).unwrap().remove(0);
        assert_eq!(post.caption, "first light");

        let response = app.get(&format!("/post_image/{}", post.id), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn empty_caption_is_rejected() {
        let app = TestApp::new();
        let (_, token) = app.member("ana");

        let response = app.post_multipart("/post_create", vec![("caption", "")], None, &token).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app.state.store.recent_posts(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let app = TestApp::with_config(Config {
            max_upload_bytes: 1024,
            ..Config::default()
        });
        let (_, token) = app.member("ana");
        let big = vec![0u8; 4096];

        let response = app
            .post_multipart("/post_create", vec![("caption", "too big")], Some(("image", "big.png", &big)), &token)
            .await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(app.state.store.recent_posts(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_multipart_post_is_redisplayed() {
        let app = TestApp::new();
        let (_, token) = app.member("ana");

        let response = app.post_form("/post_create", "caption=hi", Some(&token)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("id_caption"));
        assert!(app.state.store.recent_posts(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn static_pages_render() {
        let app = TestApp::new();

        for uri in ["/legal", "/contact"] {
            let response = app.get(uri, None).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn flash_message_shows_once() {
        let app = TestApp::new();
        let (_, token) = app.member("ana");

        let request = Request::builder()
            .uri("/")
            .header(header::COOKIE, format!("sessionid={token}; _flash=[{{\"level\":\"info\",\"message\":\"flashcheck\"}}]"))
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;

        assert!(sets_cookie(&response, "_flash"));
        assert!(body_text(response).await.contains("flashcheck"));
    }
}

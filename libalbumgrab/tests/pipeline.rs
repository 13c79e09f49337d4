//! End to end runs over HTTP against mock sites.

mod common;

use common::{drain, saved_files};
use libalbumgrab::{
    AgError, DownloadRule, Downloader, Fetcher, GalleryHost, HttpTransport, Reference,
    RetryPolicy, ThumbnailHost, Update,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc::channel;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rule(dir: &TempDir) -> DownloadRule {
    DownloadRule {
        destination_directory: Some(dir.path().to_path_buf()),
        retry: RetryPolicy::no_delay(2),
        ..Default::default()
    }
}

async fn mount_html_head(server: &MockServer, page_path: &str) {
    Mock::given(method("HEAD"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page_path: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, image_path: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).set_body_raw(content.to_vec(), "image/jpeg"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn thumbnail_album_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let album_path = "/galleries/sunset-24502267/";
    let names = ["first.jpg", "second.jpg", "third.jpg"];

    mount_html_head(&server, album_path).await;
    let links: String = names
        .iter()
        .map(|name| {
            format!(
                r#"<a class="rel-link" href="{}/1280/{name}"><img src="/460/{name}"></a>"#,
                server.uri()
            )
        })
        .collect();
    Mock::given(method("GET"))
        .and(path(album_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("<html><body>{links}</body></html>")),
        )
        .expect(1)
        .mount(&server)
        .await;
    for name in names {
        mount_image(&server, &format!("/1280/{name}"), name.as_bytes()).await;
    }

    let (tx, rx) = channel(64);
    let album = format!("{}{album_path}", server.uri());
    let mut downloader = Downloader::new(
        Reference::from(album.as_str()),
        Arc::new(ThumbnailHost::new(Url::parse(&server.uri()).unwrap())),
        rule(&dir),
        Some(tx),
    )
    .await
    .unwrap();

    assert_eq!(downloader.download(None).await.unwrap(), 3);
    assert_eq!(saved_files(dir.path()), vec!["first.jpg", "second.jpg", "third.jpg"]);
    assert_eq!(
        std::fs::read(dir.path().join("second.jpg")).unwrap(),
        b"second.jpg"
    );

    let log = std::fs::read_to_string(downloader.log_file()).unwrap();
    assert!(log.contains("Found images: 3"));
    assert!(log.contains("Successfully completed 3 files."));

    drop(downloader);
    let updates = drain(rx).await;
    assert_eq!(updates.last(), Some(&Update::BatchCompleted { count: 3 }));
}

#[tokio::test]
async fn gallery_album_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let album_path = "/actress/164947/event-photos.aspx";

    mount_page(
        &server,
        album_path,
        r#"<div id="galdiv">
            <a href="/actress/164947/event-photos1.aspx"><img src="/thumbs/1t.jpg"></a>
            <a href="/actress/164947/event-photos2.aspx"><img src="/thumbs/2t.jpg"></a>
            <a href="/actress/164947/event-photos1.aspx"><img src="/thumbs/1t.jpg"></a>
        </div>"#
            .to_string(),
    )
    .await;
    for n in 1..=2 {
        mount_page(
            &server,
            &format!("/actress/164947/event-photos{n}.aspx"),
            format!(r#"<div id="galimgview"><img src="/full/event{n}.jpg"></div>"#),
        )
        .await;
    }
    Mock::given(method("GET"))
        .and(path("/full/event1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"one".to_vec(), "image/jpeg"))
        .expect(1)
        .mount(&server)
        .await;
    mount_image(&server, "/full/event2.jpg", b"two").await;

    let mut downloader = Downloader::new(
        Reference::List(vec![format!("{}{album_path}", server.uri())]),
        Arc::new(GalleryHost::new(Url::parse(&server.uri()).unwrap())),
        rule(&dir),
        None,
    )
    .await
    .unwrap();

    assert_eq!(downloader.download(None).await.unwrap(), 2);
    assert_eq!(
        saved_files(dir.path()),
        vec!["event1-164947.jpg", "event2-164947.jpg"]
    );

    // collisions are skipped for this site, so a second run is a no-op
    assert_eq!(downloader.download(None).await.unwrap(), 0);
    assert_eq!(
        saved_files(dir.path()),
        vec!["event1-164947.jpg", "event2-164947.jpg"]
    );
}

#[tokio::test]
async fn custom_headers_are_sent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("HEAD"))
        .and(path("/photo.jpg"))
        .and(header("user-agent", "albumgrab-test"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photo.jpg"))
        .and(header("user-agent", "albumgrab-test"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"jpeg".to_vec(), "image/jpeg"))
        .mount(&server)
        .await;

    let downloader = Downloader::new(
        Reference::from(format!("{}/photo.jpg", server.uri())),
        Arc::new(ThumbnailHost::new(Url::parse(&server.uri()).unwrap())),
        DownloadRule {
            request_headers: Some(HashMap::from([(
                "User-Agent".to_string(),
                "albumgrab-test".to_string(),
            )])),
            ..rule(&dir)
        },
        None,
    )
    .await
    .unwrap();

    assert_eq!(downloader.session().image_urls.len(), 1);
    assert_eq!(downloader.save_direct_images().await.unwrap(), 1);
    assert_eq!(saved_files(dir.path()), vec!["photo.jpg"]);
}

#[tokio::test]
async fn unknown_content_type_is_rejected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("HEAD"))
        .and(path("/paper.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .mount(&server)
        .await;

    let link = format!("{}/paper.pdf", server.uri());
    let result = Downloader::new(
        Reference::from(link.as_str()),
        Arc::new(ThumbnailHost::new(Url::parse(&server.uri()).unwrap())),
        rule(&dir),
        None,
    )
    .await;

    assert!(matches!(result, Err(AgError::UnsupportedReferenceKind(l)) if l == link));
}

#[tokio::test]
async fn unreachable_host_exhausts_retries() {
    let dir = TempDir::new().unwrap();
    // Nothing listens on the discard port.
    let link = "http://127.0.0.1:9/album.aspx";
    let result = Downloader::new(
        Reference::from(link),
        Arc::new(ThumbnailHost::new(Url::parse("http://127.0.0.1:9/").unwrap())),
        rule(&dir),
        None,
    )
    .await;

    assert!(matches!(
        result,
        Err(AgError::RetriesExhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn dropped_connections_are_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            // closed without a response
        }
    });

    let fetcher = Fetcher::new(
        Arc::new(HttpTransport::new(&HashMap::new()).unwrap()),
        RetryPolicy::no_delay(3),
    );
    let url = Url::parse(&format!("http://{address}/album.aspx")).unwrap();
    let result = fetcher.text(&url, None).await;

    assert!(
        matches!(result, Err(AgError::RetriesExhausted { attempts: 3, .. })),
        "{result:?}"
    );
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn profile_discovery_collects_albums_and_their_pages() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/stars/profile/96504/someone.aspx",
        r#"<div id="galleries_panel">
            <a class="galimg" href="/actress/164765/photo-gallery.aspx"><img></a>
            <a class="galimg" href="/actress/170163/event.aspx"><img></a>
        </div>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/actress/164765/photo-gallery.aspx",
        r#"<table><tr><td id="pagingCell">
            <a href="/actress/164765/1/photo-gallery.aspx">2</a>
            <a href="/actress/164765/2/photo-gallery.aspx">3</a>
        </td></tr></table>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/actress/170163/event.aspx",
        "<p>single page album</p>".to_string(),
    )
    .await;

    let base = Url::parse(&server.uri()).unwrap();
    let host = GalleryHost::new(base.clone());
    let fetcher = Fetcher::new(
        Arc::new(HttpTransport::new(&HashMap::new()).unwrap()),
        RetryPolicy::no_delay(1),
    );
    let profile = base.join("/stars/profile/96504/someone.aspx").unwrap();

    let albums: Vec<String> = host
        .discover_albums(&fetcher, &profile)
        .await
        .unwrap()
        .into_iter()
        .map(|url| url.path().to_string())
        .collect();

    assert_eq!(
        albums,
        vec![
            "/actress/164765/1/photo-gallery.aspx",
            "/actress/164765/2/photo-gallery.aspx",
            "/actress/164765/photo-gallery.aspx",
            "/actress/170163/event.aspx",
        ]
    );
}

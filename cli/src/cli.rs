use clap::{Args, Parser, Subcommand, ValueEnum};
use libalbumgrab::{
    default_headers, AgError, DownloadRule, Downloader, Fetcher, GalleryHost, HttpTransport,
    Reference, RetryPolicy, SiteStrategy, ThumbnailHost, Update,
};
use owo_colors::{OwoColorize, Stream};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc::channel;
use url::Url;

const MAX_BUFFER_SIZE: usize = 100;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "An album image downloader",
    long_about = "Downloads every image of an album page, or of a list of album pages, into a directory."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the images of the given album(s).
    Download(DownloadArgs),
    /// Print the album pages reachable from a gallery host profile page.
    Discover(DiscoverArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Site {
    /// Album page => image pages => full images.
    Gallery,
    /// Album page links straight to the images.
    Thumbnail,
}

#[derive(Args, Debug)]
struct DownloadArgs {
    #[arg(long, value_enum)]
    site: Site,
    #[arg(
        required = true,
        help = "An image url, an album url, or several album urls."
    )]
    references: Vec<String>,
    #[arg(
        short,
        long,
        help = "Directory to save the images to. Defaults to the current directory."
    )]
    output_directory: Option<PathBuf>,
    #[arg(long, help = "Site root. Defaults to the origin of the first reference.")]
    base_url: Option<Url>,
    #[arg(
        long,
        help = "Give colliding file names a counter instead of skipping them. Defaults to the site's preference."
    )]
    unique: Option<bool>,
    #[arg(default_value = "5", long)]
    max_attempts: u32,
    #[arg(long, help = "Also save the images given directly as references.")]
    save_images: bool,
}

#[derive(Args, Debug)]
struct DiscoverArgs {
    profile_url: Url,
    #[arg(long, help = "Site root. Defaults to the origin of the profile url.")]
    base_url: Option<Url>,
    #[arg(default_value = "5", long)]
    max_attempts: u32,
}

impl Cli {
    pub async fn run(self) -> ExitCode {
        let result = match self.command {
            Command::Download(args) => download(args).await,
            Command::Discover(args) => discover(args).await,
        };
        match result {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                println!("Download wasn't able to complete");
                println!("{}", e.if_supports_color(Stream::Stdout, |text| text.red()));
                ExitCode::FAILURE
            }
        }
    }
}

async fn download(args: DownloadArgs) -> Result<(), AgError> {
    println!("Initializing download....");
    let base_url = base_url_for(args.base_url, &args.references[0])?;
    let strategy: Arc<dyn SiteStrategy> = match args.site {
        Site::Gallery => Arc::new(GalleryHost::new(base_url)),
        Site::Thumbnail => Arc::new(ThumbnailHost::new(base_url)),
    };
    let mut references = args.references;
    let reference = if references.len() == 1 {
        Reference::Single(references.remove(0))
    } else {
        Reference::List(references)
    };
    let rule = DownloadRule {
        destination_directory: args.output_directory,
        unique: args.unique,
        request_headers: None,
        retry: RetryPolicy::default().with_max_attempts(args.max_attempts),
    };
    let save_images = args.save_images;

    let (tx, mut rx) = channel::<Update>(MAX_BUFFER_SIZE);
    let task = tokio::spawn(async move {
        let mut downloader = Downloader::new(reference, strategy, rule, Some(tx)).await?;
        downloader.info().await;
        downloader.download(None).await?;
        if save_images {
            downloader.save_direct_images().await?;
        }
        Ok::<PathBuf, AgError>(downloader.session().destination_directory.clone())
    });
    while let Some(update) = rx.recv().await {
        print_update(&update);
    }

    let destination_directory = match task.await {
        Ok(result) => result?,
        Err(e) => {
            tracing::error!("Download task panicked\nError : {}", e);
            return Err(AgError::UnknownError(e.to_string()));
        }
    };
    println!(
        "Album(s) downloaded successfully. {}",
        destination_directory.to_string_lossy()
    );
    Ok(())
}

async fn discover(args: DiscoverArgs) -> Result<(), AgError> {
    let base_url = base_url_for(args.base_url, args.profile_url.as_str())?;
    let host = GalleryHost::new(base_url);
    let fetcher = Fetcher::new(
        Arc::new(HttpTransport::new(&default_headers())?),
        RetryPolicy::default().with_max_attempts(args.max_attempts),
    );
    let albums = host.discover_albums(&fetcher, &args.profile_url).await?;
    for album in albums.iter() {
        println!("{album}");
    }
    println!("Found albums: {}", albums.len());
    Ok(())
}

/// The explicit base url, or the root of `reference`.
fn base_url_for(base_url: Option<Url>, reference: &str) -> Result<Url, AgError> {
    if let Some(base_url) = base_url {
        return Ok(base_url);
    }
    Url::parse(reference)
        .and_then(|url| url.join("/"))
        .map_err(|_| AgError::InvalidUrl(reference.to_string()))
}

fn print_update(update: &Update) {
    let line = update.line();
    match update {
        Update::AlbumStarted { .. } => {
            println!("{}", line.if_supports_color(Stream::Stdout, |text| text.cyan()))
        }
        Update::Saved { .. } => {
            println!("{}", line.if_supports_color(Stream::Stdout, |text| text.green()))
        }
        Update::AlreadySaved { .. } => {
            println!("{}", line.if_supports_color(Stream::Stdout, |text| text.yellow()))
        }
        Update::BatchCompleted { .. } => {
            println!("{}", line.if_supports_color(Stream::Stdout, |text| text.bold()))
        }
        Update::SessionInfo(_) | Update::ImagesFound { .. } => println!("{line}"),
    }
}

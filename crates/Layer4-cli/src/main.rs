//! Hoist CLI 진입점
//!
//! `hoist run`으로 쉘 세션에서 명령 목록을 실행하며 이벤트를 JSON
//! 라인으로 출력하고, `hoist register`로 에이전트를 컨트롤 플레인에
//! 등록합니다.

use std::path::PathBuf;

use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hoist_foundation::{AgentConfig, JobEvent};
use hoist_job::{docker_compose_command, Api, EnvVar, FileSpec, JobExecutor, RegisterRequest};
use hoist_shell::bash_login_command;

#[derive(Parser)]
#[command(name = "hoist", version, about = "Hoist job execution agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 쉘 세션에서 명령 목록 실행
    Run {
        /// 세션 스테이징 디렉터리
        #[arg(long, default_value_os_t = default_scratch_dir())]
        scratch_dir: PathBuf,

        /// 에이전트 설정 파일 (호스트 env-vars/files를 세션에 주입)
        #[arg(long)]
        config_file: Option<PathBuf>,

        /// docker compose 매니페스트 (지정 시 컨테이너 세션)
        #[arg(long, requires = "service")]
        manifest: Option<PathBuf>,

        /// 매니페스트 안의 서비스 이름
        #[arg(long, requires = "manifest")]
        service: Option<String>,

        /// 순서대로 실행할 명령들
        #[arg(required = true)]
        commands: Vec<String>,
    },

    /// 에이전트를 컨트롤 플레인에 등록
    Register {
        /// 에이전트 설정 파일 (플래그가 없으면 endpoint/token을 여기서 읽음)
        #[arg(long)]
        config_file: Option<PathBuf>,

        /// 컨트롤 플레인 엔드포인트 (host[:port])
        #[arg(long)]
        endpoint: Option<String>,

        /// 등록 토큰
        #[arg(long)]
        token: Option<String>,

        /// 에이전트 이름
        #[arg(long)]
        name: String,

        /// https 대신 http 사용
        #[arg(long)]
        no_https: bool,
    },
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("hoist-{}", std::process::id()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scratch_dir,
            config_file,
            manifest,
            service,
            commands,
        } => run(scratch_dir, config_file, manifest, service, commands),
        Commands::Register {
            config_file,
            endpoint,
            token,
            name,
            no_https,
        } => register(config_file, endpoint, token, name, no_https).await,
    }
}

fn run(
    scratch_dir: PathBuf,
    config_file: Option<PathBuf>,
    manifest: Option<PathBuf>,
    service: Option<String>,
    commands: Vec<String>,
) -> anyhow::Result<()> {
    let spawn_cmd = match (&manifest, &service) {
        (Some(manifest), Some(service)) => {
            docker_compose_command(manifest, &scratch_dir, service)
        }
        _ => bash_login_command(),
    };

    let mut executor = JobExecutor::new(scratch_dir);
    executor
        .start(spawn_cmd)
        .context("failed to start shell session")?;

    let mut sink = |event: JobEvent| {
        if let Ok(line) = serde_json::to_string(&event) {
            println!("{}", line);
        }
    };

    let mut last_exit_code = 0;

    // 설정 파일의 호스트 환경/파일을 명령보다 먼저 주입
    if let Some(path) = config_file {
        let config = AgentConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        config.check_files()?;
        last_exit_code = inject_host_environment(&mut executor, &config, &mut sink)?;
    }

    if last_exit_code == 0 {
        for command in &commands {
            last_exit_code = executor.run_command(command, &mut sink);
            if last_exit_code != 0 {
                break;
            }
        }
    }

    executor.stop();

    if last_exit_code != 0 {
        std::process::exit(last_exit_code);
    }
    Ok(())
}

/// 설정의 env-vars/files를 복합 작업 페이로드로 변환해 주입
fn inject_host_environment(
    executor: &mut JobExecutor,
    config: &AgentConfig,
    sink: &mut dyn hoist_foundation::EventSink,
) -> anyhow::Result<i32> {
    if !config.env_vars.is_empty() {
        let vars: Vec<EnvVar> = config
            .env_vars
            .iter()
            .map(|v| EnvVar {
                name: v.name.clone(),
                value: BASE64.encode(&v.value),
            })
            .collect();

        let exit_code = executor.export_env_vars(&vars, sink);
        if exit_code != 0 {
            return Ok(exit_code);
        }
    }

    if !config.files.is_empty() {
        let mut files = Vec::new();
        for file in &config.files {
            match std::fs::read(&file.host_path) {
                Ok(content) => files.push(FileSpec {
                    path: file.destination.clone(),
                    content: BASE64.encode(content),
                    mode: "0644".to_string(),
                }),
                Err(e) if !config.fail_on_missing_files => {
                    info!("Skipping {}: {}", file.host_path.display(), e);
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("failed to read {}", file.host_path.display())
                    });
                }
            }
        }

        let exit_code = executor.inject_files(&files, sink);
        if exit_code != 0 {
            return Ok(exit_code);
        }
    }

    Ok(0)
}

async fn register(
    config_file: Option<PathBuf>,
    endpoint: Option<String>,
    token: Option<String>,
    name: String,
    no_https: bool,
) -> anyhow::Result<()> {
    let (endpoint, token, no_https) = match (endpoint, token, config_file) {
        (Some(endpoint), Some(token), _) => (endpoint, token, no_https),
        (endpoint, token, Some(path)) => {
            let config = AgentConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            (
                endpoint.unwrap_or(config.endpoint),
                token.unwrap_or(config.token),
                no_https || config.no_https,
            )
        }
        _ => bail!("endpoint and token are required (flags or --config-file)"),
    };

    let api = Api::new(endpoint, token, no_https);
    let request = RegisterRequest {
        name,
        os: std::env::consts::OS.to_string(),
    };

    let response = api.register(&request).await?;
    info!("Agent registered");
    println!("{}", response.access_token);
    Ok(())
}

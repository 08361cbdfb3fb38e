mod cli;
mod infra;
mod routes;
mod server;

use tuition_hub::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    casewise_lib::run().await
}

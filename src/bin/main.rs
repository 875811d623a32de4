//! Native development server: wraps the shared router in actix-web with an
//! in-memory repository, since no Spin host is present on the workstation.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    extern crate microblog;

    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use log::info;
    use microblog::core::repo::MemRepo;

    mod adapter {
        use actix_web::HttpRequest;
        use spin_sdk::http::{Method, Request};

        pub fn actix_to_spin_request(
            req: &HttpRequest,
            body: actix_web::web::Bytes,
        ) -> anyhow::Result<Request> {
            let method = match req.method().as_str() {
                "GET" => Method::Get,
                "POST" => Method::Post,
                "PUT" => Method::Put,
                "DELETE" => Method::Delete,
                "HEAD" => Method::Head,
                "OPTIONS" => Method::Options,
                "PATCH" => Method::Patch,
                _ => Method::Get,
            };

            let uri = req.uri().to_string();
            let body_vec = body.to_vec();

            let mut req_builder = Request::builder();
            let method_set = req_builder.method(method);
            let uri_set = method_set.uri(&uri);

            // Copy headers
            let mut with_headers = uri_set;
            for (name, value) in req.headers() {
                if let Ok(val_str) = value.to_str() {
                    with_headers = with_headers.header(name.as_str(), val_str);
                }
            }

            Ok(with_headers.body(body_vec).build())
        }

        pub fn spin_to_actix_response(spin_resp: spin_sdk::http::Response) -> actix_web::HttpResponse {
            let status = *spin_resp.status();
            let body = spin_resp.body().to_vec();

            let mut response = actix_web::HttpResponse::build(
                actix_web::http::StatusCode::from_u16(status)
                    .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
            );

            // Location, Set-Cookie and Content-Type must survive the hop
            for (name, value) in spin_resp.headers() {
                if let Some(val_str) = value.as_str() {
                    response.append_header((name, val_str));
                }
            }

            response.body(body)
        }
    }

    pub async fn run() -> std::io::Result<()> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        let repo = web::Data::new(MemRepo::new());
        info!("Server listening on http://127.0.0.1:3000");

        HttpServer::new(move || {
            App::new()
                .app_data(repo.clone())
                .default_service(web::route().to(handle_all))
        })
        .bind("127.0.0.1:3000")?
        .run()
        .await
    }

    async fn handle_all(
        repo: web::Data<MemRepo>,
        req: HttpRequest,
        body: web::Bytes,
    ) -> HttpResponse {
        let spin_req = match adapter::actix_to_spin_request(&req, body) {
            Ok(r) => r,
            Err(_) => return HttpResponse::BadRequest().finish(),
        };

        adapter::spin_to_actix_response(microblog::route(repo.get_ref(), &spin_req))
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}

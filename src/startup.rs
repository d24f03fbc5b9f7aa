use actix_web::dev::Server;
use actix_web::{error, middleware::Logger, web, App, HttpRequest, HttpServer};
use sqlx::SqlitePool;
use std::net::TcpListener;

use crate::auth::AuthService;
use crate::configuration::Settings;
use crate::error::{AppError, ValidationError};
use crate::logger::RequestLogger;
use crate::middleware::JwtMiddleware;
use crate::repository::Repositories;
use crate::routes::{
    add_group_member, create_group, create_location, current_user, delete_group, delete_location,
    delete_user, get_group, get_location, get_user, health_check, list_group_locations,
    list_group_members, list_groups, list_location_groups, list_locations, list_user_groups,
    list_user_locations, list_users, login, logout, logout_all, refresh, register,
    remove_group_member, share_location, unshare_location, update_group, update_location,
    update_share_visibility, update_user,
};

fn invalid_request(what: &str, err: impl std::fmt::Display) -> actix_web::Error {
    tracing::debug!(error = %err, "Rejected {}", what);
    AppError::Validation(ValidationError::InvalidFormat(what.to_string())).into()
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    invalid_request("request body", err)
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    invalid_request("path parameter", err)
}

/// Build the HTTP server on `listener`
///
/// Every repository shares `pool`. Routes under `/api` require an access token.
pub fn run(
    listener: TcpListener,
    pool: SqlitePool,
    settings: &Settings,
) -> Result<Server, std::io::Error> {
    settings
        .jwt
        .validate()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let repositories = Repositories::sqlite(pool.clone());
    let auth_service = AuthService::new(
        repositories.users.clone(),
        repositories.refresh_tokens.clone(),
        settings.jwt.clone(),
        settings.password.hash_cost,
    )
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let pool = web::Data::new(pool);
    let auth_service = web::Data::new(auth_service);
    let users = web::Data::from(repositories.users);
    let groups = web::Data::from(repositories.groups);
    let locations = web::Data::from(repositories.locations);
    let memberships = web::Data::from(repositories.memberships);
    let shares = web::Data::from(repositories.shares);
    let jwt_config = settings.jwt.clone();

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(RequestLogger)
            // Request parsing
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::PathConfig::default().error_handler(path_error))
            // Shared state
            .app_data(pool.clone())
            .app_data(auth_service.clone())
            .app_data(users.clone())
            .app_data(groups.clone())
            .app_data(locations.clone())
            .app_data(memberships.clone())
            .app_data(shares.clone())
            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/logout", web::post().to(logout)),
            )
            // Protected routes (require JWT authentication)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("/me", web::get().to(current_user))
                    .route("/logout-all", web::post().to(logout_all))
                    .service(
                        web::scope("/users")
                            .route("", web::get().to(list_users))
                            .route("/{id}", web::get().to(get_user))
                            .route("/{id}", web::put().to(update_user))
                            .route("/{id}", web::delete().to(delete_user))
                            .route("/{id}/locations", web::get().to(list_user_locations))
                            .route("/{id}/groups", web::get().to(list_user_groups)),
                    )
                    .service(
                        web::scope("/groups")
                            .route("", web::post().to(create_group))
                            .route("", web::get().to(list_groups))
                            .route("/{id}", web::get().to(get_group))
                            .route("/{id}", web::put().to(update_group))
                            .route("/{id}", web::delete().to(delete_group))
                            .route("/{id}/users", web::post().to(add_group_member))
                            .route("/{id}/users", web::get().to(list_group_members))
                            .route("/{id}/users/{user_id}", web::delete().to(remove_group_member))
                            .route("/{id}/locations", web::post().to(share_location))
                            .route("/{id}/locations", web::get().to(list_group_locations))
                            .route(
                                "/{id}/locations/{location_id}",
                                web::put().to(update_share_visibility),
                            )
                            .route(
                                "/{id}/locations/{location_id}",
                                web::delete().to(unshare_location),
                            ),
                    )
                    .service(
                        web::scope("/locations")
                            .route("", web::post().to(create_location))
                            .route("", web::get().to(list_locations))
                            .route("/{id}", web::get().to(get_location))
                            .route("/{id}", web::put().to(update_location))
                            .route("/{id}", web::delete().to(delete_location))
                            .route("/{id}/groups", web::get().to(list_location_groups)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

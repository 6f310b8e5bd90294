pub mod admin_handlers;
pub mod auth_handlers;
pub mod catalog_handlers;
pub mod profile_handlers;

use actix_web::web;

/// Registers every view under its scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth_handlers::auth_state) // GET /auth/state
            .service(auth_handlers::sign_in) // POST /auth/signin
            .service(auth_handlers::sign_up) // POST /auth/signup
            .service(auth_handlers::sign_out), // POST /auth/signout
    )
    .service(
        web::scope("/api")
            .service(catalog_handlers::list_subjects)
            .service(catalog_handlers::subject_page)
            .service(catalog_handlers::lesson_page)
            .service(catalog_handlers::complete_lesson)
            .service(catalog_handlers::list_comments)
            .service(catalog_handlers::add_comment)
            .service(catalog_handlers::delete_comment)
            .service(profile_handlers::get_profile)
            .service(profile_handlers::update_profile),
    )
    .service(
        web::scope("/admin")
            .service(admin_handlers::dashboard)
            .service(admin_handlers::list_subjects)
            .service(admin_handlers::create_subject)
            .service(admin_handlers::update_subject)
            .service(admin_handlers::delete_subject)
            .service(admin_handlers::list_lessons)
            .service(admin_handlers::create_lesson)
            .service(admin_handlers::update_lesson)
            .service(admin_handlers::delete_lesson)
            .service(admin_handlers::list_users)
            .service(admin_handlers::update_user_role)
            .service(admin_handlers::upload_image)
            .service(admin_handlers::delete_image),
    );
}

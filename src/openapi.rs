use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        description = "E-commerce storefront backend: catalog, carts, checkout, payment reconciliation, admin orders"
    ),
    paths(
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_to_cart,
        crate::handlers::carts::remove_from_cart,
        crate::handlers::checkout::initiate_checkout,
        crate::handlers::checkout::verify_payment,
        crate::handlers::orders::order_history,
        crate::handlers::orders::get_order,
        crate::handlers::admin::list_orders,
        crate::handlers::admin::update_order_status,
        crate::handlers::admin::dashboard,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::products::CreateProductRequest,
        crate::handlers::products::UpdateProductRequest,
        crate::handlers::carts::AddItemRequest,
        crate::handlers::checkout::CheckoutRequest,
        crate::handlers::checkout::VerifyPaymentRequest,
        crate::handlers::admin::UpdateStatusRequest,
        crate::services::checkout::ShippingAddress,
        crate::services::checkout::CheckoutSummary,
        crate::services::checkout::PaymentConfirmation,
        crate::services::analytics::DashboardStats,
        crate::services::analytics::TopProduct,
    )),
    tags(
        (name = "Catalog", description = "Product catalog"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Checkout", description = "Checkout and payment reconciliation"),
        (name = "Orders", description = "Customer order history"),
        (name = "Admin", description = "Admin order management and dashboard")
    )
)]
pub struct ApiDoc;

/// Swagger UI router, mounted at `/docs`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

//! End-to-end flows through the HTTP router.
use axum::http::{header, StatusCode};
use serde_json::json;

mod common;
use common::*;

mod cart_tests {
    use super::*;

    #[tokio::test]
    async fn test_session_cookie_is_issued_once() {
        let app = TestApp::new();
        let cookie = app.session().await;
        assert!(cookie.starts_with("sid="));
        let again = app.get("/api/cart", Some(&cookie)).await;
        assert!(again.headers.get(header::SET_COOKIE).is_none());
        assert_eq!(again.body, json!({ "success": true, "cart": { "items": [], "total": 0 } }));
    }

    #[tokio::test]
    async fn test_adding_same_product_merges_quantities() {
        let app = TestApp::new();
        let cookie = app.session().await;
        app.add_item(&cookie, "A", 1500, 1).await;
        let response = app.add_item(&cookie, "A", 1500, 2).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["cart"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(response.body["cart"]["items"][0]["quantity"], 3);
        assert_eq!(response.body["cart"]["total"], 4500);
    }

    #[tokio::test]
    async fn test_carts_are_isolated_per_session() {
        let app = TestApp::new();
        let first = app.session().await;
        let second = app.session().await;
        app.add_item(&first, "A", 1500, 1).await;
        let other = app.get("/api/cart", Some(&second)).await;
        assert_eq!(other.body["cart"]["total"], 0);
    }

    #[tokio::test]
    async fn test_quantity_below_one_is_rejected() {
        let app = TestApp::new();
        let cookie = app.session().await;
        app.add_item(&cookie, "A", 1500, 2).await;
        for quantity in [0, -3] {
            let response = app.json("PUT", "/api/cart", Some(&cookie), json!({ "productRef": "A", "quantity": quantity })).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST);
            assert_eq!(response.body["success"], false);
        }
        let cart = app.get("/api/cart", Some(&cookie)).await;
        assert_eq!(cart.body["cart"]["items"][0]["quantity"], 2);
        assert_eq!(app.add_item(&cookie, "B", 100, 0).await.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_price_or_quantity_is_rejected() {
        let app = TestApp::new();
        let cookie = app.session().await;
        let response = app.add_item(&cookie, "A", i64::MAX / 2 + 1, 2).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["success"], false);
        assert_eq!(app.add_item(&cookie, "B", 100, 4_000_000_000).await.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.add_item(&cookie, "C", 100, 10_001).await.status, StatusCode::BAD_REQUEST);
        let cart = app.get("/api/cart", Some(&cookie)).await;
        assert_eq!(cart.body["cart"]["total"], 0);
    }

    #[tokio::test]
    async fn test_removing_absent_line_succeeds_unchanged() {
        let app = TestApp::new();
        let cookie = app.session().await;
        app.add_item(&cookie, "A", 1500, 1).await;
        let response = app.send(
            axum::http::Request::builder()
                .method("DELETE")
                .uri("/api/cart?productRef=NOPE")
                .header(header::COOKIE, &cookie)
                .body(axum::body::Body::empty())
                .unwrap(),
        ).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["success"], true);
        assert_eq!(response.body["cart"]["total"], 1500);
    }

    #[tokio::test]
    async fn test_missing_fields_name_the_field() {
        let app = TestApp::new();
        let cookie = app.session().await;
        let response = app.json("POST", "/api/cart", Some(&cookie), json!({ "productRef": "A", "name": "Watch", "price": 10, "image": "/a.jpg" })).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.body["error"].as_str().unwrap().contains("slug"));
    }
}

mod checkout_tests {
    use super::*;

    #[tokio::test]
    async fn test_checkout_creates_order_and_clears_cart() {
        let app = TestApp::new();
        let cookie = app.session().await;
        app.add_item(&cookie, "A", 1500, 2).await;
        let response = app.checkout(&cookie, "cod").await;
        assert_eq!(response.status, StatusCode::CREATED);
        let order = &response.body["order"];
        assert_eq!(order["orderNumber"], "ORD-000001");
        assert_eq!(order["subtotal"], 3000);
        assert_eq!(order["deliveryCharges"], 250);
        assert_eq!(order["totalAmount"], 3250);
        assert_eq!(order["paymentStatus"], "pending");
        assert_eq!(order["status"], "pending");

        let cart = app.get("/api/cart", Some(&cookie)).await;
        assert_eq!(cart.body["cart"]["items"].as_array().unwrap().len(), 0);

        let emails = app.emails(2).await;
        assert!(emails.iter().any(|e| e.to == STORE_EMAIL && e.subject.contains("ORD-000001")));
        assert!(emails.iter().any(|e| e.to == "hamza@example.com"));
    }

    #[tokio::test]
    async fn test_free_shipping_at_threshold() {
        let app = TestApp::new();
        let cookie = app.session().await;
        app.add_item(&cookie, "A", 7000, 1).await;
        let order = app.checkout(&cookie, "jazzcash").await.body["order"].clone();
        assert_eq!(order["deliveryCharges"], 0);
        assert_eq!(order["totalAmount"], 7000);
        assert_eq!(order["paymentStatus"], "awaiting_verification");
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let app = TestApp::new();
        let cookie = app.session().await;
        let response = app.checkout(&cookie, "cod").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "Your cart is empty");
    }

    #[tokio::test]
    async fn test_validation_names_missing_field() {
        let app = TestApp::new();
        let cookie = app.session().await;
        app.add_item(&cookie, "A", 1500, 1).await;
        let mut address = shipping_address();
        address["postalCode"] = json!("");
        let response = app.json("POST", "/api/checkout", Some(&cookie), json!({ "shippingAddress": address, "paymentMethod": "cod" })).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "Missing required field: postalCode");

        let response = app.checkout(&cookie, "cheque").await;
        assert_eq!(response.body["error"], "Invalid payment method");
        assert_eq!(app.get("/api/cart", Some(&cookie)).await.body["cart"]["total"], 1500);
    }

    #[tokio::test]
    async fn test_order_numbers_increase() {
        let app = TestApp::new();
        assert_eq!(app.place_order("cod", 100).await, "ORD-000001");
        assert_eq!(app.place_order("cod", 100).await, "ORD-000002");
    }
}

mod order_tests {
    use super::*;

    #[tokio::test]
    async fn test_order_read_hides_screenshot_and_disables_caching() {
        let app = TestApp::new();
        let (number, cookie) = app.place_order_in_session("bank_transfer", 2000).await;
        app.upload(&number, "bank_transfer", "image/png", PNG).await;
        let response = app.get(&format!("/api/orders/{number}"), Some(&cookie)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
        assert_eq!(response.body["order"]["hasScreenshot"], true);
        assert!(response.body["order"].get("paymentScreenshot").is_none());
        assert!(response.body["order"]["screenshotUploadedAt"].is_string());
    }

    #[tokio::test]
    async fn test_order_is_visible_only_to_its_session() {
        let app = TestApp::new();
        let (number, owner) = app.place_order_in_session("cod", 2000).await;
        let stranger = app.session().await;
        let uri = format!("/api/orders/{number}");

        let anonymous = app.get(&uri, None).await;
        assert_eq!(anonymous.status, StatusCode::NOT_FOUND);
        assert!(anonymous.body.get("order").is_none());
        assert_eq!(app.get(&uri, Some(&stranger)).await.status, StatusCode::NOT_FOUND);

        let own = app.get(&uri, Some(&owner)).await;
        assert_eq!(own.status, StatusCode::OK);
        assert_eq!(own.body["order"]["shippingAddress"]["email"], shipping_address()["email"]);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let app = TestApp::new();
        assert_eq!(app.get("/api/orders/ORD-424242", None).await.status, StatusCode::NOT_FOUND);
        assert_eq!(app.get("/api/orders/garbage", None).await.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_verify_pending_order_without_screenshot_fails() {
        let app = TestApp::new();
        let number = app.place_order("cod", 2000).await;
        let response = app.json("POST", &format!("/api/orders/{number}/verify-payment"), None, json!({})).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.payment_status(&number).await, "pending");
    }

    #[tokio::test]
    async fn test_upload_then_verify_marks_paid() {
        let app = TestApp::new();
        let number = app.place_order("easypaisa", 2000).await;
        let uploaded = app.upload(&number, "easypaisa", "image/png", PNG).await;
        assert_eq!(uploaded.status, StatusCode::OK, "{}", uploaded.body);
        assert_eq!(uploaded.body["order"]["paymentStatus"], "awaiting_verification");

        let verified = app.json("POST", &format!("/api/orders/{number}/verify-payment"), None, json!({})).await;
        assert_eq!(verified.status, StatusCode::OK);
        assert_eq!(verified.body["order"]["paymentStatus"], "paid");
        assert!(verified.body["order"]["paymentVerifiedAt"].is_string());

        let again = app.json("POST", &format!("/api/orders/{number}/verify-payment"), None, json!({})).await;
        assert_eq!(again.status, StatusCode::BAD_REQUEST);

        let emails = app.emails(5).await;
        assert!(emails.iter().any(|e| e.subject == format!("Payment proof uploaded for {number}")));
        assert!(emails.iter().any(|e| e.subject == format!("Payment confirmed for {number}")));
    }

    #[tokio::test]
    async fn test_second_screenshot_is_rejected() {
        let app = TestApp::new();
        let number = app.place_order("jazzcash", 2000).await;
        assert_eq!(app.upload(&number, "jazzcash", "image/png", PNG).await.status, StatusCode::OK);
        let token = app.admin_token().await;
        let before = app.admin("GET", &format!("/api/admin/orders/{number}"), &token, None).await.body["order"]["paymentScreenshot"].clone();

        let second = app.upload(&number, "jazzcash", "image/png", PNG).await;
        assert_eq!(second.status, StatusCode::CONFLICT);
        let after = app.admin("GET", &format!("/api/admin/orders/{number}"), &token, None).await.body["order"]["paymentScreenshot"].clone();
        assert_eq!(before, after);
        assert_eq!(app.stored_screenshots(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_files() {
        let app = TestApp::new();
        let number = app.place_order("jazzcash", 2000).await;
        assert_eq!(app.upload(&number, "jazzcash", "image/gif", PNG).await.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.upload(&number, "jazzcash", "image/png", b"not an image").await.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.upload(&number, "jazzcash", "image/png", &[0x89; 4096]).await.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.upload(&number, "cod", "image/png", PNG).await.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.upload("ORD-999999", "jazzcash", "image/png", PNG).await.status, StatusCode::NOT_FOUND);
        assert_eq!(app.stored_screenshots(), 0);
    }
}

mod payfast_tests {
    use super::*;

    fn itn<'a>(number: &'a str, status: &'a str, gross: &'a str) -> Vec<(&'a str, &'a str)> {
        vec![
            ("m_payment_id", number),
            ("pf_payment_id", "1089250"),
            ("payment_status", status),
            ("amount_gross", gross),
        ]
    }

    #[tokio::test]
    async fn test_initiate_returns_signed_payload() {
        let app = TestApp::new();
        let (number, cookie) = app.place_order_in_session("payfast", 2000).await;
        let stranger = app.json("POST", "/api/payfast/initiate", None, json!({ "orderNumber": number })).await;
        assert_eq!(stranger.status, StatusCode::NOT_FOUND);
        let response = app.json("POST", "/api/payfast/initiate", Some(&cookie), json!({ "orderNumber": number })).await;
        assert_eq!(response.status, StatusCode::OK);
        let fields = &response.body["payment"]["fields"];
        assert_eq!(fields["m_payment_id"], number.as_str());
        assert_eq!(fields["amount"], "2250.00");
        assert_eq!(fields["notify_url"], "https://shop.test/api/payfast/webhook");
        assert_eq!(fields["signature"].as_str().unwrap().len(), 32);

        let (cod, cookie) = app.place_order_in_session("cod", 2000).await;
        let response = app.json("POST", "/api/payfast/initiate", Some(&cookie), json!({ "orderNumber": cod })).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tampered_webhook_leaves_order_unchanged() {
        let app = TestApp::new();
        let number = app.place_order("payfast", 2000).await;
        let mut fields = itn(&number, "FAILED", "2250.00");
        let signature = app.state.payfast.sign(&fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<Vec<_>>());
        fields[2].1 = "COMPLETE";
        fields.push(("signature", signature.as_str()));
        let response = app.webhook(&fields, false).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["success"], false);
        assert_eq!(app.payment_status(&number).await, "pending");
    }

    #[tokio::test]
    async fn test_repeated_complete_is_idempotent() {
        let app = TestApp::new();
        let number = app.place_order("payfast", 2000).await;
        let first = app.webhook(&itn(&number, "COMPLETE", "2250.00"), true).await;
        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.body["applied"], true);
        let placed_and_paid = app.emails(3).await.len();

        let second = app.webhook(&itn(&number, "COMPLETE", "2250.00"), true).await;
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(second.body["applied"], false);
        assert_eq!(app.payment_status(&number).await, "paid");

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(app.mailer.sent.lock().unwrap().len(), placed_and_paid);
    }

    #[tokio::test]
    async fn test_cancelled_marks_failed() {
        let app = TestApp::new();
        let number = app.place_order("payfast", 2000).await;
        assert_eq!(app.webhook(&itn(&number, "CANCELLED", "2250.00"), true).await.status, StatusCode::OK);
        assert_eq!(app.payment_status(&number).await, "failed");
    }

    #[tokio::test]
    async fn test_return_redirects() {
        let app = TestApp::new();
        let success = app.get("/api/payfast/webhook?result=success&order=ORD-000007", None).await;
        assert_eq!(success.status, StatusCode::SEE_OTHER);
        assert_eq!(success.headers.get(header::LOCATION).unwrap(), "https://shop.test/order-confirmation/ORD-000007");
        let cancel = app.get("/api/payfast/webhook?result=cancel&order=ORD-000007", None).await;
        assert_eq!(cancel.headers.get(header::LOCATION).unwrap(), "https://shop.test/checkout?cancelled=ORD-000007");
    }
}

mod catalog_tests {
    use super::*;

    async fn create_watch(app: &TestApp, token: &str) {
        let response = app.admin("POST", "/api/admin/products", token, Some(json!({
            "name": "Chrono Steel",
            "code": "wt-100",
            "category": "Watches",
            "price": 8500,
            "compareAtPrice": 9900,
            "images": ["/img/chrono.jpg"],
        }))).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    }

    #[tokio::test]
    async fn test_product_listing_and_detail() {
        let app = TestApp::new();
        let token = app.admin_token().await;
        create_watch(&app, &token).await;

        let list = app.get("/api/products?category=watches", None).await;
        assert_eq!(list.body["products"]["total"], 1);
        assert_eq!(list.body["products"]["data"][0]["slug"], "chrono-steel");
        assert_eq!(list.body["products"]["data"][0]["code"], "WT-100");

        let detail = app.get("/api/products/chrono-steel", None).await;
        assert_eq!(detail.status, StatusCode::OK);
        assert_eq!(detail.body["rating"]["count"], 0);

        let duplicate = app.admin("POST", "/api/admin/products", &token, Some(json!({
            "name": "Chrono Steel", "code": "WT-101", "category": "watches", "price": 100,
        }))).await;
        assert_eq!(duplicate.status, StatusCode::CONFLICT);

        assert_eq!(app.admin("DELETE", "/api/admin/products/chrono-steel", &token, None).await.status, StatusCode::OK);
        assert_eq!(app.get("/api/products/chrono-steel", None).await.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reviews_count_once_approved() {
        let app = TestApp::new();
        let token = app.admin_token().await;
        create_watch(&app, &token).await;

        let submitted = app.json("POST", "/api/products/chrono-steel/reviews", None, json!({ "name": "Zara", "rating": 4, "comment": "Great watch" })).await;
        assert_eq!(submitted.status, StatusCode::CREATED);
        let bad = app.json("POST", "/api/products/chrono-steel/reviews", None, json!({ "name": "Zara", "rating": 9, "comment": "!" })).await;
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.get("/api/products/chrono-steel/reviews", None).await.body["reviews"], json!([]));

        let id = submitted.body["review"]["id"].as_str().unwrap().to_string();
        let pending = app.admin("GET", "/api/admin/reviews?approved=false", &token, None).await;
        assert_eq!(pending.body["reviews"].as_array().unwrap().len(), 1);
        assert_eq!(app.admin("POST", &format!("/api/admin/reviews/{id}/approve"), &token, None).await.status, StatusCode::OK);

        let detail = app.get("/api/products/chrono-steel", None).await;
        assert_eq!(detail.body["rating"], json!({ "count": 1, "average": 4.0 }));
    }
}

mod admin_tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let app = TestApp::new();
        assert_eq!(app.get("/api/admin/orders", None).await.status, StatusCode::UNAUTHORIZED);
        assert_eq!(app.admin("GET", "/api/admin/stats", "forged.token.value", None).await.status, StatusCode::UNAUTHORIZED);
        let wrong = app.json("POST", "/api/admin/login", None, json!({ "password": "guess" })).await;
        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_sets_cookie_that_authorises() {
        let app = TestApp::new();
        let response = app.json("POST", "/api/admin/login", None, json!({ "password": ADMIN_PASSWORD })).await;
        let set_cookie = response.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with("admin_token="));
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = set_cookie.split(';').next().unwrap();
        assert_eq!(app.get("/api/admin/stats", Some(cookie)).await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_status_is_rejected() {
        let app = TestApp::new();
        let token = app.admin_token().await;
        let number = app.place_order("cod", 2000).await;
        let uri = format!("/api/admin/orders/{number}");
        let response = app.admin("PATCH", &uri, &token, Some(json!({ "paymentStatus": "refunded" }))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        let response = app.admin("PATCH", &uri, &token, Some(json!({ "status": "teleported" }))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let response = app.admin("PATCH", &uri, &token, Some(json!({ "status": "processing", "paymentStatus": "paid" }))).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["order"]["status"], "processing");
        let backwards = app.admin("PATCH", &uri, &token, Some(json!({ "paymentStatus": "pending" }))).await;
        assert_eq!(backwards.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_listing_stats_and_delete() {
        let app = TestApp::new();
        let token = app.admin_token().await;
        let paid = app.place_order("jazzcash", 8000).await;
        app.place_order("cod", 1000).await;
        app.upload(&paid, "jazzcash", "image/png", PNG).await;
        assert_eq!(app.admin("POST", &format!("/api/admin/orders/{paid}/verify"), &token, None).await.status, StatusCode::OK);

        let listed = app.admin("GET", "/api/admin/orders?paymentStatus=paid", &token, None).await;
        assert_eq!(listed.body["orders"]["total"], 1);
        assert_eq!(app.admin("GET", "/api/admin/orders?paymentStatus=bogus", &token, None).await.status, StatusCode::BAD_REQUEST);

        let stats = app.admin("GET", "/api/admin/stats", &token, None).await.body["stats"].clone();
        assert_eq!(stats["totalOrders"], 2);
        assert_eq!(stats["revenue"], 8000);
        assert_eq!(stats["ordersByPaymentStatus"]["paid"], 1);

        assert_eq!(app.admin("DELETE", &format!("/api/admin/orders/{paid}"), &token, None).await.status, StatusCode::OK);
        assert_eq!(app.stored_screenshots(), 0);
        assert!(app.state.orders.get(&paid).await.is_err());
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    assert_eq!(response.body, json!({ "status": "healthy", "service": "storefront" }));
}

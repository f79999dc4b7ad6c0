//! Interface strings in English and Greek
//!
//! Lookups fall back to English and then to the key itself, so a missing
//! translation never breaks a page.

use std::collections::BTreeMap;

use crate::types::Language;

const EN: &[(&str, &str)] = &[
    // Common
    ("dashboard", "Dashboard"),
    ("search", "Search"),
    ("sync", "Sync"),
    ("profile", "Profile"),
    ("change_password", "Change Password"),
    ("logout", "Logout"),
    ("save", "Save"),
    ("cancel", "Cancel"),
    ("delete", "Delete"),
    ("edit", "Edit"),
    ("back", "Back"),
    ("loading", "Loading..."),
    ("success", "Success"),
    ("error", "Error"),
    ("view_all", "View All"),
    ("action", "Action"),
    ("actions", "Actions"),
    // Auth
    ("login", "Login"),
    ("username", "Username"),
    ("password", "Password"),
    ("invalid_credentials", "Invalid username or password"),
    ("account_locked", "Too many failed login attempts. Please try again later."),
    ("login_required", "Please log in to continue"),
    ("please_change_default_password", "Please change your default password for security reasons."),
    ("password_changed_successfully", "Password changed successfully"),
    ("invalid_current_password", "Current password is incorrect"),
    ("password_too_short", "Password must be at least 8 characters"),
    ("password_must_differ", "New password must be different from the current one"),
    ("logged_out", "You have been logged out"),
    // Dashboard
    ("total_products", "Total Products"),
    ("inventory_value", "Inventory Value"),
    ("low_stock_items", "Low Stock Items"),
    ("last_sync", "Last Sync"),
    ("never", "Never"),
    ("refresh", "Refresh"),
    ("recently_updated_products", "Recently Updated Products"),
    ("products_low_in_stock", "Products Low in Stock"),
    ("recently_added_to_online_shop", "Recently Added to Online Shop"),
    ("top_selling_products", "Top Selling Products"),
    ("products_low_in_stock_online", "Products Low in Stock in Online Shop"),
    ("no_recently_updated_products", "No recently updated products."),
    ("no_products_with_low_stock", "No products with low stock."),
    ("no_recently_added_products", "No recently added products in online shop."),
    ("no_sales_data_available", "No sales data available."),
    ("no_products_with_low_stock_online", "No products with low stock in online shop."),
    // Product table headers
    ("product", "Product"),
    ("sku", "SKU"),
    ("stock", "Stock"),
    ("updated", "Updated"),
    ("added", "Added"),
    ("price", "Price"),
    ("sales", "Sales"),
    // Time
    ("just_now", "just now"),
    ("minutes_ago", "minutes ago"),
    ("hours_ago", "hours ago"),
    ("days_ago", "days ago"),
    ("hour", "hour"),
    ("hours", "hours"),
    ("ago", "ago"),
    // Search
    ("product_search", "Product Search"),
    ("search_placeholder", "Search by product name or SKU..."),
    ("clear", "Clear"),
    ("low_stock", "Low Stock"),
    ("no_products_found", "No products found."),
    ("all_products", "All Products"),
    ("update_stock", "Update Stock"),
    // Product
    ("edit_product", "Edit Product"),
    ("product_title", "Product Title"),
    ("category", "Category"),
    ("stock_quantity", "Stock Quantity"),
    ("low_stock_threshold", "Low Stock Threshold"),
    ("notes", "Notes"),
    ("last_updated", "Last Updated"),
    ("product_image", "Product Image"),
    ("no_image_available", "No image available"),
    ("product_information", "Product Information"),
    ("variable_product", "Variable Product"),
    ("product_variation", "Product Variation"),
    ("product_variations", "Product Variations"),
    ("no_variations_found", "No variations found for this product."),
    ("total_stock", "Total Stock"),
    // Profile
    ("profile_information", "Profile Information"),
    ("full_name", "Full Name"),
    ("email_address", "Email Address"),
    ("member_since", "Member Since"),
    ("last_login", "Last Login"),
    ("role", "Role"),
    // Messages
    ("product_updated_successfully", "Product updated successfully"),
    ("failed_to_update_product", "Failed to update product"),
    ("product_not_found", "Product not found."),
    ("product_deleted", "Product deleted"),
    ("variation_not_found", "Variation not found"),
    ("variation_deleted", "Variation deleted and will be skipped by future syncs"),
    ("invalid_variation_id", "Invalid variation ID"),
    ("stock_updated_successfully", "Stock updated successfully"),
    ("failed_to_update_stock", "Failed to update stock"),
    ("please_enter_valid_stock", "Please enter a valid stock quantity (0 or greater)"),
    ("variable_stock_is_computed", "Variable products take their stock from their variations"),
    ("permission_denied", "You do not have permission to perform this action"),
    // Sync
    ("sync_in_progress", "Sync in progress"),
    ("sync_completed", "Sync completed"),
    ("sync_failed", "Sync failed"),
    ("sync_reset", "Sync state cleared"),
    ("importing_products", "Importing products..."),
    ("importing_variations", "Importing variable products and variations..."),
    // Language names
    ("language_english", "English"),
    ("language_greek", "Greek"),
];

const EL: &[(&str, &str)] = &[
    // Common
    ("dashboard", "Πίνακας Ελέγχου"),
    ("search", "Αναζήτηση"),
    ("sync", "Συγχρονισμός"),
    ("profile", "Προφίλ"),
    ("change_password", "Αλλαγή Κωδικού"),
    ("logout", "Αποσύνδεση"),
    ("save", "Αποθήκευση"),
    ("cancel", "Ακύρωση"),
    ("delete", "Διαγραφή"),
    ("edit", "Επεξεργασία"),
    ("back", "Πίσω"),
    ("loading", "Φόρτωση..."),
    ("success", "Επιτυχία"),
    ("error", "Σφάλμα"),
    ("view_all", "Προβολή Όλων"),
    ("action", "Ενέργεια"),
    ("actions", "Ενέργειες"),
    // Auth
    ("login", "Σύνδεση"),
    ("username", "Όνομα Χρήστη"),
    ("password", "Κωδικός Πρόσβασης"),
    ("invalid_credentials", "Λάθος όνομα χρήστη ή κωδικός πρόσβασης"),
    ("account_locked", "Πάρα πολλές αποτυχημένες προσπάθειες σύνδεσης. Δοκιμάστε ξανά αργότερα."),
    ("login_required", "Συνδεθείτε για να συνεχίσετε"),
    ("please_change_default_password", "Παρακαλώ αλλάξτε τον προεπιλεγμένο κωδικό για λόγους ασφαλείας."),
    ("password_changed_successfully", "Ο κωδικός άλλαξε επιτυχώς"),
    ("invalid_current_password", "Ο τρέχων κωδικός δεν είναι σωστός"),
    ("password_too_short", "Ο κωδικός πρέπει να έχει τουλάχιστον 8 χαρακτήρες"),
    ("password_must_differ", "Ο νέος κωδικός πρέπει να διαφέρει από τον τρέχοντα"),
    ("logged_out", "Αποσυνδεθήκατε"),
    // Dashboard
    ("total_products", "Σύνολο Προϊόντων"),
    ("inventory_value", "Αξία Αποθέματος"),
    ("low_stock_items", "Προϊόντα με Χαμηλό Απόθεμα"),
    ("last_sync", "Τελευταίος Συγχρονισμός"),
    ("never", "Ποτέ"),
    ("refresh", "Ανανέωση"),
    ("recently_updated_products", "Πρόσφατα Ενημερωμένα Προϊόντα"),
    ("products_low_in_stock", "Προϊόντα με Χαμηλό Απόθεμα"),
    ("recently_added_to_online_shop", "Πρόσφατα Προστεθέντα στο Ηλεκτρονικό Κατάστημα"),
    ("top_selling_products", "Κορυφαία Προϊόντα Πωλήσεων"),
    ("products_low_in_stock_online", "Προϊόντα με Χαμηλό Απόθεμα στο Ηλεκτρονικό Κατάστημα"),
    ("no_recently_updated_products", "Δεν υπάρχουν πρόσφατα ενημερωμένα προϊόντα."),
    ("no_products_with_low_stock", "Δεν υπάρχουν προϊόντα με χαμηλό απόθεμα."),
    ("no_recently_added_products", "Δεν υπάρχουν πρόσφατα προστεθέντα προϊόντα στο ηλεκτρονικό κατάστημα."),
    ("no_sales_data_available", "Δεν υπάρχουν διαθέσιμα δεδομένα πωλήσεων."),
    ("no_products_with_low_stock_online", "Δεν υπάρχουν προϊόντα με χαμηλό απόθεμα στο ηλεκτρονικό κατάστημα."),
    // Product table headers
    ("product", "Προϊόν"),
    ("sku", "SKU"),
    ("stock", "Απόθεμα"),
    ("updated", "Ενημερώθηκε"),
    ("added", "Προστέθηκε"),
    ("price", "Τιμή"),
    ("sales", "Πωλήσεις"),
    // Time
    ("just_now", "μόλις τώρα"),
    ("minutes_ago", "λεπτά πριν"),
    ("hours_ago", "ώρες πριν"),
    ("days_ago", "ημέρες πριν"),
    ("hour", "ώρα"),
    ("hours", "ώρες"),
    ("ago", "πριν"),
    // Search
    ("product_search", "Αναζήτηση Προϊόντων"),
    ("search_placeholder", "Αναζήτηση ανά όνομα προϊόντος ή SKU..."),
    ("clear", "Καθαρισμός"),
    ("low_stock", "Χαμηλό Απόθεμα"),
    ("no_products_found", "Δεν βρέθηκαν προϊόντα."),
    ("all_products", "Όλα τα Προϊόντα"),
    ("update_stock", "Ενημέρωση Αποθέματος"),
    // Product
    ("edit_product", "Επεξεργασία Προϊόντος"),
    ("product_title", "Τίτλος Προϊόντος"),
    ("category", "Κατηγορία"),
    ("stock_quantity", "Ποσότητα Αποθέματος"),
    ("low_stock_threshold", "Όριο Χαμηλού Αποθέματος"),
    ("notes", "Σημειώσεις"),
    ("last_updated", "Τελευταία Ενημέρωση"),
    ("product_image", "Εικόνα Προϊόντος"),
    ("no_image_available", "Δεν υπάρχει διαθέσιμη εικόνα"),
    ("product_information", "Πληροφορίες Προϊόντος"),
    ("variable_product", "Μεταβλητό Προϊόν"),
    ("product_variation", "Παραλλαγή Προϊόντος"),
    ("product_variations", "Παραλλαγές Προϊόντος"),
    ("no_variations_found", "Δεν βρέθηκαν παραλλαγές για αυτό το προϊόν."),
    ("total_stock", "Συνολικό Απόθεμα"),
    // Profile
    ("profile_information", "Πληροφορίες Προφίλ"),
    ("full_name", "Πλήρες Όνομα"),
    ("email_address", "Διεύθυνση Email"),
    ("member_since", "Μέλος από"),
    ("last_login", "Τελευταία Σύνδεση"),
    ("role", "Ρόλος"),
    // Messages
    ("product_updated_successfully", "Το προϊόν ενημερώθηκε επιτυχώς"),
    ("failed_to_update_product", "Αποτυχία ενημέρωσης προϊόντος"),
    ("product_not_found", "Το προϊόν δεν βρέθηκε."),
    ("product_deleted", "Το προϊόν διαγράφηκε"),
    ("variation_not_found", "Η παραλλαγή δεν βρέθηκε"),
    ("variation_deleted", "Η παραλλαγή διαγράφηκε και θα παραλείπεται στους επόμενους συγχρονισμούς"),
    ("invalid_variation_id", "Μη έγκυρο αναγνωριστικό παραλλαγής"),
    ("stock_updated_successfully", "Το απόθεμα ενημερώθηκε επιτυχώς"),
    ("failed_to_update_stock", "Αποτυχία ενημέρωσης αποθέματος"),
    ("please_enter_valid_stock", "Παρακαλώ εισάγετε έγκυρη ποσότητα αποθέματος (0 ή μεγαλύτερη)"),
    ("variable_stock_is_computed", "Τα μεταβλητά προϊόντα παίρνουν το απόθεμά τους από τις παραλλαγές"),
    ("permission_denied", "Δεν έχετε δικαίωμα για αυτή την ενέργεια"),
    // Sync
    ("sync_in_progress", "Συγχρονισμός σε εξέλιξη"),
    ("sync_completed", "Ο συγχρονισμός ολοκληρώθηκε"),
    ("sync_failed", "Ο συγχρονισμός απέτυχε"),
    ("sync_reset", "Η κατάσταση συγχρονισμού καθαρίστηκε"),
    ("importing_products", "Εισαγωγή προϊόντων..."),
    ("importing_variations", "Εισαγωγή μεταβλητών προϊόντων και παραλλαγών..."),
    // Language names
    ("language_english", "Αγγλικά"),
    ("language_greek", "Ελληνικά"),
];

fn table(lang: Language) -> &'static [(&'static str, &'static str)] {
    match lang {
        Language::English => EN,
        Language::Greek => EL,
    }
}

fn lookup(lang: Language, key: &str) -> Option<&'static str> {
    table(lang)
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
}

/// Translate `key`, falling back to English and then to the key itself
pub fn translate(lang: Language, key: &str) -> &str {
    lookup(lang, key)
        .or_else(|| lookup(Language::English, key))
        .unwrap_or(key)
}

/// Full catalog for a language with English filling any gaps
pub fn catalog(lang: Language) -> BTreeMap<&'static str, &'static str> {
    let mut strings: BTreeMap<_, _> = EN.iter().copied().collect();
    strings.extend(table(lang).iter().copied());
    strings
}

//! Curated identifier catalog.
//!
//! Powers resolution of bare widget names and the local search sources.
//! Entries are `(name, home library, one-line description)`; the tables are
//! intentionally a subset of the API surface, covering the classes and
//! packages people ask for most.

/// Well-known Flutter widgets and classes.
pub const FLUTTER_WIDGETS: &[(&str, &str, &str)] = &[
    // State management related
    ("StatefulWidget", "widgets", "Base class for widgets that have mutable state"),
    ("StatelessWidget", "widgets", "Base class for widgets that don't require mutable state"),
    ("State", "widgets", "Logic and internal state for a StatefulWidget"),
    ("InheritedWidget", "widgets", "Base class for widgets that propagate information down the tree"),
    ("ValueListenableBuilder", "widgets", "Rebuilds when ValueListenable changes"),
    ("NotificationListener", "widgets", "Listens for Notifications bubbling up"),
    // Layout widgets
    ("Container", "widgets", "A convenience widget that combines common painting, positioning, and sizing"),
    ("Row", "widgets", "Displays children in a horizontal array"),
    ("Column", "widgets", "Displays children in a vertical array"),
    ("Stack", "widgets", "Positions children relative to the box edges"),
    ("Scaffold", "material", "Basic material design visual layout structure"),
    ("Expanded", "widgets", "Expands a child to fill available space in Row/Column"),
    ("Flexible", "widgets", "Controls how a child flexes in Row/Column"),
    ("Wrap", "widgets", "Displays children in multiple runs"),
    ("Align", "widgets", "Aligns a child within itself"),
    ("Center", "widgets", "Centers a child within itself"),
    ("Positioned", "widgets", "Positions a child in a Stack"),
    ("AspectRatio", "widgets", "Constrains child to specific aspect ratio"),
    ("ConstrainedBox", "widgets", "Imposes additional constraints on child"),
    ("SizedBox", "widgets", "Box with a specified size"),
    ("LayoutBuilder", "widgets", "Builds widget tree based on parent constraints"),
    ("Padding", "widgets", "Insets its child by the given padding"),
    // Navigation
    ("Navigator", "widgets", "Manages a stack of Route objects"),
    ("MaterialPageRoute", "material", "A modal route that replaces the entire screen"),
    ("NavigationBar", "material", "Material 3 navigation bar"),
    ("BottomNavigationBar", "material", "Bottom navigation bar"),
    ("Drawer", "material", "Material design drawer"),
    ("TabBar", "material", "Material design tabs"),
    ("TabBarView", "material", "Page view for TabBar"),
    // Input widgets
    ("TextField", "material", "A material design text field"),
    ("TextFormField", "material", "A FormField that contains a TextField"),
    ("Form", "widgets", "Container for form fields"),
    ("GestureDetector", "widgets", "Detects gestures on widgets"),
    ("InkWell", "material", "Rectangular area that responds to touch with ripple"),
    ("Dismissible", "widgets", "Can be dismissed by dragging"),
    ("DropdownButton", "material", "Material design dropdown button"),
    ("Slider", "material", "Material design slider"),
    ("Switch", "material", "Material design switch"),
    ("Checkbox", "material", "Material design checkbox"),
    ("Radio", "material", "Material design radio button"),
    // Lists & grids
    ("ListView", "widgets", "Scrollable list of widgets"),
    ("GridView", "widgets", "Scrollable 2D array of widgets"),
    ("CustomScrollView", "widgets", "ScrollView with slivers"),
    ("SingleChildScrollView", "widgets", "Box with single scrollable child"),
    ("PageView", "widgets", "Scrollable list that works page by page"),
    ("RefreshIndicator", "material", "Material design pull-to-refresh"),
    // Common material widgets
    ("AppBar", "material", "A material design app bar"),
    ("Card", "material", "A material design card"),
    ("ListTile", "material", "A single fixed-height row for lists"),
    ("IconButton", "material", "A material design icon button"),
    ("ElevatedButton", "material", "A material design elevated button"),
    ("FloatingActionButton", "material", "A material design floating action button"),
    ("CircularProgressIndicator", "material", "Material circular progress"),
    ("LinearProgressIndicator", "material", "Material linear progress"),
    ("SnackBar", "material", "Material design snackbar"),
    ("BottomSheet", "material", "Material design bottom sheet"),
    ("DataTable", "material", "Material design data table"),
    // Visual effects
    ("Opacity", "widgets", "Makes child partially transparent"),
    ("Transform", "widgets", "Applies transformation before painting"),
    ("ClipRRect", "widgets", "Clips child to rounded rectangle"),
    ("DecoratedBox", "widgets", "Paints decoration around child"),
    ("BackdropFilter", "widgets", "Applies filter to existing painted content"),
    // Animation
    ("AnimatedBuilder", "widgets", "A widget that rebuilds when animation changes"),
    ("AnimationController", "animation", "Controls an animation"),
    ("Hero", "widgets", "Marks a child for hero animations"),
    ("AnimatedContainer", "widgets", "Animated version of Container"),
    ("AnimatedOpacity", "widgets", "Animated version of Opacity"),
    ("AnimatedSwitcher", "widgets", "Animates when switching between children"),
    // Async widgets
    ("FutureBuilder", "widgets", "Builds based on interaction with a Future"),
    ("StreamBuilder", "widgets", "Builds based on interaction with a Stream"),
    // Utility widgets
    ("MediaQuery", "widgets", "Establishes media query subtree"),
    ("Theme", "material", "Applies theme to descendant widgets"),
    ("Semantics", "widgets", "Annotates widget tree with semantic descriptions"),
];

/// Well-known Dart core library classes.
pub const DART_CLASSES: &[(&str, &str, &str)] = &[
    ("List", "dart:core", "An indexable collection of objects with a length"),
    ("Map", "dart:core", "A collection of key/value pairs"),
    ("Set", "dart:core", "A collection of objects with no duplicate elements"),
    ("String", "dart:core", "A sequence of UTF-16 code units"),
    ("Future", "dart:async", "Represents a computation that completes with a value or error"),
    ("Stream", "dart:async", "A source of asynchronous data events"),
    ("Duration", "dart:core", "A span of time"),
    ("DateTime", "dart:core", "An instant in time"),
    ("RegExp", "dart:core", "A regular expression pattern"),
    ("Iterable", "dart:core", "A collection of values that can be accessed sequentially"),
];

/// Popular pub.dev packages with one-line descriptions.
pub const POPULAR_PACKAGES: &[(&str, &str)] = &[
    // State management
    ("provider", "State management library that makes it easy to connect business logic to widgets"),
    ("riverpod", "A reactive caching and data-binding framework"),
    ("bloc", "State management library implementing the BLoC design pattern"),
    ("flutter_bloc", "Flutter widgets that make it easy to implement the BLoC design pattern"),
    ("get", "Open source state management, navigation and utilities"),
    ("get_it", "Service locator for dependency injection"),
    ("mobx", "Reactive state management library"),
    // Networking
    ("dio", "Powerful HTTP client for Dart with interceptors and FormData"),
    ("http", "A composable, multi-platform, Future-based API for HTTP requests"),
    ("retrofit", "Type-safe HTTP client generator"),
    ("web_socket_channel", "WebSocket connections"),
    // Storage & database
    ("shared_preferences", "Flutter plugin for reading and writing simple key-value pairs"),
    ("sqflite", "SQLite plugin for Flutter with support for iOS, Android and MacOS"),
    ("hive", "Lightweight and blazing fast key-value database written in pure Dart"),
    ("isar", "Fast cross-platform database"),
    ("drift", "Reactive persistence library"),
    // Firebase
    ("firebase_core", "Flutter plugin to use Firebase Core API"),
    ("firebase_auth", "Flutter plugin for Firebase Auth"),
    ("cloud_firestore", "Flutter plugin for Cloud Firestore"),
    ("firebase_messaging", "Push notifications via FCM"),
    // UI/UX
    ("animations", "Beautiful pre-built animations for Flutter"),
    ("flutter_svg", "SVG rendering and widget library for Flutter"),
    ("cached_network_image", "Flutter library to load and cache network images"),
    ("shimmer", "Shimmer loading effect"),
    ("lottie", "Render After Effects animations"),
    ("carousel_slider", "Carousel widget"),
    // Platform integration
    ("url_launcher", "Flutter plugin for launching URLs"),
    ("path_provider", "Flutter plugin for getting commonly used locations on the filesystem"),
    ("image_picker", "Flutter plugin for selecting images from image library or camera"),
    ("connectivity_plus", "Flutter plugin for discovering network connectivity"),
    ("permission_handler", "Permission plugin for Flutter"),
    ("geolocator", "Flutter geolocation plugin for Android and iOS"),
    ("google_fonts", "Flutter package to use fonts from fonts.google.com"),
    ("share_plus", "Share content to other apps"),
    // Navigation
    ("go_router", "A declarative routing package for Flutter"),
    ("auto_route", "Code generation for type-safe route navigation"),
    // Developer tools
    ("logger", "Beautiful logging utility"),
    ("equatable", "Simplify equality comparisons"),
    ("freezed", "Code generation for immutable classes"),
    ("json_serializable", "Automatically generate code for JSON"),
    ("build_runner", "Build system for Dart code generation"),
];

/// Concept map: topic keyword to related identifiers.
pub const CONCEPTS: &[(&str, &[(&str, &str)])] = &[
    ("state management", &[
        ("setState", "The simplest way to manage state in Flutter"),
        ("InheritedWidget", "Share data across the widget tree"),
        ("provider", "Popular state management package"),
        ("riverpod", "Improved provider with compile-time safety"),
        ("bloc", "Business Logic Component pattern"),
        ("ValueNotifier", "Simple observable pattern"),
        ("ChangeNotifier", "Observable object for multiple listeners"),
    ]),
    ("navigation", &[
        ("Navigator", "Stack-based navigation in Flutter"),
        ("go_router", "Declarative routing package"),
        ("auto_route", "Code generation for routes"),
        ("Hero animations", "Animate widgets between routes"),
        ("Deep linking", "Handle URLs in your app"),
    ]),
    ("http", &[
        ("http", "Official Dart HTTP package"),
        ("dio", "Advanced HTTP client with interceptors"),
        ("retrofit", "Type-safe HTTP client generator"),
        ("WebSocket", "Real-time bidirectional communication"),
    ]),
    ("database", &[
        ("sqflite", "SQLite for Flutter"),
        ("hive", "NoSQL database for Flutter"),
        ("drift", "Reactive persistence library"),
        ("shared_preferences", "Simple key-value storage"),
        ("isar", "Fast cross-platform database"),
    ]),
    ("animation", &[
        ("AnimationController", "Control animations"),
        ("AnimatedBuilder", "Build animations efficiently"),
        ("Hero", "Shared element transitions"),
        ("AnimatedContainer", "Implicit animations"),
        ("TweenAnimationBuilder", "Simple custom animations"),
        ("Curves", "Animation easing functions"),
    ]),
    ("architecture", &[
        ("BLoC Pattern", "Business Logic Component pattern for state management"),
        ("MVVM", "Model-View-ViewModel architecture pattern"),
        ("Clean Architecture", "Domain-driven design with clear separation"),
        ("Repository Pattern", "Abstraction layer for data sources"),
    ]),
    ("testing", &[
        ("Widget Testing", "Testing Flutter widgets in isolation"),
        ("Integration Testing", "End-to-end testing of Flutter apps"),
        ("Golden Testing", "Visual regression testing"),
        ("Mockito", "Mocking framework for Dart"),
        ("flutter_test", "Flutter testing framework"),
    ]),
    ("performance", &[
        ("Performance Profiling", "Analyzing app performance"),
        ("RepaintBoundary", "Isolate expensive paints"),
        ("Const Constructors", "Compile-time optimizations"),
        ("Lazy Loading", "Loading content on demand"),
    ]),
    ("forms", &[
        ("Form", "Container for form fields"),
        ("TextFormField", "Text input with validation"),
        ("Form Validation", "Validating user input"),
        ("Input Formatters", "Format input as typed"),
    ]),
    ("theming", &[
        ("ThemeData", "Application theme configuration"),
        ("Dark Mode", "Supporting dark theme"),
        ("Color Schemes", "Material 3 color system"),
        ("Typography", "Text theming"),
    ]),
];

/// Look up a widget by exact name.
pub fn flutter_widget(name: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    FLUTTER_WIDGETS.iter().find(|(n, _, _)| *n == name)
}

/// Look up a concept by keyword, matching any whole word of the query.
pub fn concept_entries(query: &str) -> Option<(&'static str, &'static [(&'static str, &'static str)])> {
    let query = query.to_lowercase();
    CONCEPTS
        .iter()
        .find(|(concept, _)| {
            query.contains(concept)
                || query
                    .split_whitespace()
                    .any(|w| w.len() > 3 && concept.contains(w))
        })
        .map(|(concept, items)| (*concept, *items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flutter_widget_lookup() {
        let (name, library, _) = flutter_widget("Scaffold").unwrap();
        assert_eq!(*name, "Scaffold");
        assert_eq!(*library, "material");

        let (_, library, _) = flutter_widget("Container").unwrap();
        assert_eq!(*library, "widgets");

        assert!(flutter_widget("NotAWidget").is_none());
        // Lookup is case-sensitive, as widget names are
        assert!(flutter_widget("container").is_none());
    }

    #[test]
    fn test_concept_lookup() {
        let (concept, items) = concept_entries("state management").unwrap();
        assert_eq!(concept, "state management");
        assert!(items.iter().any(|(n, _)| *n == "provider"));

        // A single word of the query is enough
        let (concept, _) = concept_entries("how do I do navigation").unwrap();
        assert_eq!(concept, "navigation");

        assert!(concept_entries("quantum chromodynamics").is_none());
    }

    #[test]
    fn test_catalog_has_no_duplicate_widgets() {
        let mut names: Vec<&str> = FLUTTER_WIDGETS.iter().map(|(n, _, _)| *n).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }
}

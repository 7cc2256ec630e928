use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, Ident, ItemFn, LitStr};

const USAGE: &str = "rxcore_macro::test only accepts: #[rxcore_macro::test], \
                     #[rxcore_macro::test(local)], #[rxcore_macro::test(shared)], or string \
                     equivalents";

/// Marks a test function for the rxcore test harness.
///
/// Sync functions become plain `#[test]`s. Async functions run on tokio;
/// `local` selects the current-thread runtime (the default) and `shared`
/// the multi-thread runtime, which pooled-scheduler tests need.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  let is_async = input.sig.asyncness.is_some();

  let raw_args = proc_macro2::TokenStream::from(attr);
  let tokio_args = if raw_args.is_empty() {
    proc_macro2::TokenStream::new()
  } else {
    if !is_async {
      return TokenStream::from(
        syn::Error::new(
          raw_args.span(),
          "rxcore_macro::test flavor args are only supported for async tests. Use \
           #[rxcore_macro::test] for sync tests, or make the function async.",
        )
        .to_compile_error(),
      );
    }

    let flavor = if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
      runtime_flavor(&ident.to_string()).ok_or_else(|| syn::Error::new(ident.span(), USAGE))
    } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
      runtime_flavor(&lit.value()).ok_or_else(|| syn::Error::new(lit.span(), USAGE))
    } else {
      Err(syn::Error::new(raw_args.span(), USAGE))
    };

    match flavor {
      Ok(flavor) => quote!(flavor = #flavor),
      Err(err) => return TokenStream::from(err.to_compile_error()),
    }
  };

  let attr = if is_async { quote!(tokio::test(#tokio_args)) } else { quote!(test) };

  let expanded = quote! {
      #[#attr]
      #input
  };

  TokenStream::from(expanded)
}

fn runtime_flavor(arg: &str) -> Option<&'static str> {
  match arg {
    "local" => Some("current_thread"),
    "shared" => Some("multi_thread"),
    _ => None,
  }
}

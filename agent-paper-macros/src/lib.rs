use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Lit,
    PathArguments, Type,
};

/// Derives `agent_paper_sdk::FlowDefinition` for a clap `Args` struct.
///
/// Reads `#[flow(id, name, description)]` on the struct and optional
/// `#[field(label, description, type, min, max, pattern, total_phases,
/// required_for_phases)]` on each field. CLI names and defaults come from the
/// field's `#[arg(...)]` attribute.
#[proc_macro_derive(FlowDefinition, attributes(flow, field))]
pub fn derive_flow_definition(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let flow_meta = match extract_flow_meta(&input.attrs) {
        Ok(meta) => meta,
        Err(e) => return e.to_compile_error().into(),
    };

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return syn::Error::new_spanned(&input.ident, "FlowDefinition only supports named fields")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(&input.ident, "FlowDefinition only supports structs")
                .to_compile_error()
                .into()
        }
    };

    let mut field_schemas = Vec::new();
    for f in named {
        let Some(ident) = f.ident.as_ref() else {
            continue;
        };
        let name = ident.to_string();

        // The metadata flag itself is not an input
        if name == "flow_metadata" {
            continue;
        }

        let meta = match extract_field_meta(&f.attrs) {
            Ok(meta) => meta,
            Err(e) => return e.to_compile_error().into(),
        };
        let arg = extract_arg_meta(&f.attrs, &name);

        let field_type = meta.field_type.unwrap_or_else(|| infer_field_type(&f.ty));
        let label = if meta.label.is_empty() { name.replace('_', " ") } else { meta.label };
        let description = meta.description;
        let cli_arg = arg.cli_arg;
        let required = !is_option_type(&f.ty) && !is_bool_type(&f.ty) && arg.default.is_none();
        let default = match arg.default {
            Some(val) => quote! { Some(#val.to_string()) },
            None => quote! { None },
        };
        let required_for_phases = match meta.required_for_phases {
            Some(phases) => quote! { Some(vec![#(#phases),*]) },
            None => quote! { None },
        };

        field_schemas.push(quote! {
            ::agent_paper_sdk::FieldSchema {
                name: #name.to_string(),
                field_type: #field_type,
                label: #label.to_string(),
                description: #description.to_string(),
                cli_arg: #cli_arg.to_string(),
                required: #required,
                default: #default,
                required_for_phases: #required_for_phases,
            }
        });
    }

    let struct_name = &input.ident;
    let flow_id = &flow_meta.id;
    let flow_name = &flow_meta.name;
    let flow_desc = &flow_meta.description;

    let expanded = quote! {
        impl ::agent_paper_sdk::FlowDefinition for #struct_name {
            fn metadata() -> ::agent_paper_sdk::FlowMetadata {
                ::agent_paper_sdk::FlowMetadata {
                    id: #flow_id.to_string(),
                    name: #flow_name.to_string(),
                    description: #flow_desc.to_string(),
                }
            }

            fn fields() -> Vec<::agent_paper_sdk::FieldSchema> {
                vec![#(#field_schemas),*]
            }
        }
    };

    TokenStream::from(expanded)
}

struct FlowMeta {
    id: String,
    name: String,
    description: String,
}

fn lit_str(meta: &syn::meta::ParseNestedMeta) -> syn::Result<String> {
    let value = meta.value()?;
    match value.parse::<Lit>()? {
        Lit::Str(s) => Ok(s.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

fn extract_flow_meta(attrs: &[Attribute]) -> syn::Result<FlowMeta> {
    for attr in attrs {
        if !attr.path().is_ident("flow") {
            continue;
        }

        let mut meta_out = FlowMeta {
            id: String::new(),
            name: String::new(),
            description: String::new(),
        };

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                meta_out.id = lit_str(&meta)?;
            } else if meta.path.is_ident("name") {
                meta_out.name = lit_str(&meta)?;
            } else if meta.path.is_ident("description") {
                meta_out.description = lit_str(&meta)?;
            } else {
                return Err(meta.error("unknown flow attribute"));
            }
            Ok(())
        })?;

        return Ok(meta_out);
    }

    Err(syn::Error::new(
        proc_macro2::Span::call_site(),
        "missing #[flow(...)] attribute",
    ))
}

#[derive(Default)]
struct FieldMeta {
    label: String,
    description: String,
    field_type: Option<proc_macro2::TokenStream>,
    required_for_phases: Option<Vec<usize>>,
}

fn extract_field_meta(attrs: &[Attribute]) -> syn::Result<FieldMeta> {
    let mut out = FieldMeta::default();
    let mut kind = None;
    let mut min = None;
    let mut max = None;
    let mut pattern = None;
    let mut total_phases = None;

    for attr in attrs {
        if !attr.path().is_ident("field") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("label") {
                out.label = lit_str(&meta)?;
            } else if meta.path.is_ident("description") {
                out.description = lit_str(&meta)?;
            } else if meta.path.is_ident("type") {
                kind = Some(lit_str(&meta)?);
            } else if meta.path.is_ident("min") {
                min = lit_str(&meta)?.parse::<i64>().ok();
            } else if meta.path.is_ident("max") {
                max = lit_str(&meta)?.parse::<i64>().ok();
            } else if meta.path.is_ident("pattern") {
                pattern = Some(lit_str(&meta)?);
            } else if meta.path.is_ident("total_phases") {
                total_phases = lit_str(&meta)?.parse::<usize>().ok();
            } else if meta.path.is_ident("required_for_phases") {
                let phases = lit_str(&meta)?
                    .split(',')
                    .filter_map(|s| s.trim().parse().ok())
                    .collect();
                out.required_for_phases = Some(phases);
            } else {
                return Err(meta.error("unknown field attribute"));
            }
            Ok(())
        })?;
    }

    out.field_type = match kind.as_deref() {
        None => None,
        Some("text") => Some(quote! { ::agent_paper_sdk::FieldType::Text }),
        Some("flag") => Some(quote! { ::agent_paper_sdk::FieldType::Flag }),
        Some("number") => {
            let min_token = option_tokens(min);
            let max_token = option_tokens(max);
            Some(quote! { ::agent_paper_sdk::FieldType::Number { min: #min_token, max: #max_token } })
        }
        Some("file_path") => {
            let pattern_token = match pattern {
                Some(p) => quote! { Some(#p.to_string()) },
                None => quote! { None },
            };
            Some(quote! { ::agent_paper_sdk::FieldType::FilePath { pattern: #pattern_token } })
        }
        Some("phase_selector") => {
            let total = total_phases.unwrap_or(5);
            Some(quote! { ::agent_paper_sdk::FieldType::PhaseSelector { total_phases: #total } })
        }
        Some(other) => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unknown field type '{}'", other),
            ))
        }
    };

    Ok(out)
}

fn option_tokens(value: Option<i64>) -> proc_macro2::TokenStream {
    match value {
        Some(v) => quote! { Some(#v) },
        None => quote! { None },
    }
}

struct ArgMeta {
    cli_arg: String,
    default: Option<String>,
}

/// Reads `long` and `default_value` out of clap's `#[arg(...)]`
fn extract_arg_meta(attrs: &[Attribute], field_name: &str) -> ArgMeta {
    let mut long_name = None;
    let mut default = None;

    for attr in attrs {
        if !attr.path().is_ident("arg") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            let is_long = meta.path.is_ident("long");
            let is_default = meta.path.is_ident("default_value");

            if meta.input.peek(syn::Token![=]) {
                let expr: Expr = meta.value()?.parse()?;
                let text = match &expr {
                    Expr::Lit(lit) => match &lit.lit {
                        Lit::Str(s) => Some(s.value()),
                        _ => None,
                    },
                    _ => None,
                };
                if is_long {
                    long_name = text;
                } else if is_default {
                    default = text;
                }
            } else if is_long {
                long_name = Some(field_name.replace('_', "-"));
            }
            Ok(())
        });
    }

    let long = long_name.unwrap_or_else(|| field_name.replace('_', "-"));
    ArgMeta {
        cli_arg: format!("--{}", long),
        default,
    }
}

fn infer_field_type(ty: &Type) -> proc_macro2::TokenStream {
    let inner = option_inner(ty).unwrap_or(ty);
    let Type::Path(type_path) = inner else {
        return quote! { ::agent_paper_sdk::FieldType::Text };
    };
    let Some(segment) = type_path.path.segments.last() else {
        return quote! { ::agent_paper_sdk::FieldType::Text };
    };

    match segment.ident.to_string().as_str() {
        "PathBuf" => quote! { ::agent_paper_sdk::FieldType::FilePath { pattern: None } },
        "bool" => quote! { ::agent_paper_sdk::FieldType::Flag },
        "usize" | "u32" | "u64" | "i32" | "i64" => {
            quote! { ::agent_paper_sdk::FieldType::Number { min: None, max: None } }
        }
        _ => quote! { ::agent_paper_sdk::FieldType::Text },
    }
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

fn is_option_type(ty: &Type) -> bool {
    option_inner(ty).is_some()
}

fn is_bool_type(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.path.is_ident("bool"))
}
